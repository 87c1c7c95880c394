//! Keep or drop actions by the contract that executes them.
//!
//! Expressions are comma-separated terms. A term is either an account (`eosio.token`), which
//! matches every action executed by that account, or an account and action name
//! (`eosio.token::transfer`). An action is kept when it matches the include expression (an empty
//! include expression matches everything) and does not match the exclude expression. Transactions
//! left without actions are dropped.

use crate::{Action, Block, Error, Filter, Filtering};
use std::collections::HashSet;

/// Separator between an account and an action name in a term.
const ACTION_SEPARATOR: &str = "::";

/// Separator between expressions successively applied to the same block.
const CHAIN_SEPARATOR: char = ';';

#[derive(Clone, Debug, Default)]
struct Terms {
    accounts: HashSet<String>,
    actions: HashSet<(String, String)>,
}

impl Terms {
    fn parse(expr: &str) -> Result<Self, Error> {
        let mut terms = Self::default();
        for term in expr.split(',').map(str::trim).filter(|term| !term.is_empty()) {
            let invalid = || Error::InvalidFilter(term.to_string());
            if term.contains(char::is_whitespace) || term.contains(CHAIN_SEPARATOR) {
                return Err(invalid());
            }
            match term.split_once(ACTION_SEPARATOR) {
                None => {
                    terms.accounts.insert(term.to_string());
                }
                Some((account, action)) => {
                    if account.is_empty() || action.is_empty() || action.contains(':') {
                        return Err(invalid());
                    }
                    terms
                        .actions
                        .insert((account.to_string(), action.to_string()));
                }
            }
        }
        Ok(terms)
    }

    fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.actions.is_empty()
    }

    fn matches(&self, action: &Action) -> bool {
        self.accounts.contains(&action.account)
            || self
                .actions
                .contains(&(action.account.clone(), action.name.clone()))
    }
}

/// A [Filter] on the account (and optionally name) of each action.
#[derive(Clone, Debug)]
pub struct Accounts {
    include_expr: String,
    exclude_expr: String,
    include: Terms,
    exclude: Terms,
}

impl Accounts {
    /// Parse include and exclude expressions, failing with [Error::InvalidFilter] on a malformed
    /// term.
    pub fn parse(include: &str, exclude: &str) -> Result<Self, Error> {
        Ok(Self {
            include_expr: include.trim().to_string(),
            exclude_expr: exclude.trim().to_string(),
            include: Terms::parse(include)?,
            exclude: Terms::parse(exclude)?,
        })
    }

    /// Whether the filter leaves every block untouched.
    pub fn is_noop(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

}

impl Filter for Accounts {
    fn apply(&self, block: &mut Block) -> Result<(), Error> {
        // Each side is skipped on its own when the block already went through it.
        let (mut include, mut exclude) = (!self.include.is_empty(), !self.exclude.is_empty());
        if let Some(previous) = &block.filtering {
            include &= !applied(&previous.include, &self.include_expr);
            exclude &= !applied(&previous.exclude, &self.exclude_expr);
        }
        if !include && !exclude {
            return Ok(());
        }

        let filtering = match block.filtering.take() {
            // Original counts are kept across filters.
            Some(previous) => Filtering {
                include: if include {
                    chain(&previous.include, &self.include_expr)
                } else {
                    previous.include
                },
                exclude: if exclude {
                    chain(&previous.exclude, &self.exclude_expr)
                } else {
                    previous.exclude
                },
                ..previous
            },
            None => Filtering {
                include: if include {
                    self.include_expr.clone()
                } else {
                    String::new()
                },
                exclude: if exclude {
                    self.exclude_expr.clone()
                } else {
                    String::new()
                },
                unfiltered_transactions: block.transactions.len() as u32,
                unfiltered_actions: block.actions() as u32,
            },
        };
        for tx in &mut block.transactions {
            tx.actions.retain(|action| {
                (!include || self.include.matches(action))
                    && !(exclude && self.exclude.matches(action))
            });
        }
        block.transactions.retain(|tx| !tx.actions.is_empty());
        block.filtering = Some(filtering);
        Ok(())
    }
}

/// Whether `expr` is empty or one of the expressions already chained in `previous`.
fn applied(previous: &str, expr: &str) -> bool {
    expr.is_empty() || previous.split(CHAIN_SEPARATOR).any(|applied| applied == expr)
}

fn chain(previous: &str, next: &str) -> String {
    if previous.is_empty() {
        return next.to_string();
    }
    format!("{previous}{CHAIN_SEPARATOR}{next}")
}
