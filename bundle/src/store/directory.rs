use crate::{Body, Chunks, Error, List, Store};
use bytes::BytesMut;
use futures::{stream, StreamExt};
use std::{io::ErrorKind, path::PathBuf};
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

/// Size of chunks read from files.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Suffix of files that are still being written.
const PARTIAL_SUFFIX: &str = ".partial";

/// A [Store] that keeps each object in a file of a single directory.
///
/// Objects are written to a hidden temporary file and renamed into place once complete, so a
/// crash or abort never exposes a partial object.
#[derive(Clone, Debug)]
pub struct Directory {
    root: PathBuf,
}

impl Directory {
    /// Open (creating if needed) the store rooted at `root`.
    ///
    /// Temporary files left behind by interrupted writes are removed.
    pub async fn init(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        let mut entries = fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') && name.ends_with(PARTIAL_SUFFIX) {
                debug!(name, "removing partial object");
                fs::remove_file(entry.path()).await?;
            }
        }
        Ok(Self { root })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Store for Directory {
    async fn exists(&self, name: &str) -> Result<bool, Error> {
        Ok(fs::try_exists(self.path(name)).await?)
    }

    async fn open(&self, name: &str) -> Result<Body, Error> {
        let file = match File::open(self.path(name)).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(name.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        let body = stream::unfold(Some(file), |file| async move {
            let mut file = file?;
            let mut chunk = BytesMut::with_capacity(READ_CHUNK_SIZE);
            match file.read_buf(&mut chunk).await {
                Ok(0) => None,
                Ok(_) => Some((Ok(chunk.freeze()), Some(file))),
                Err(err) => Some((Err(err.into()), None)),
            }
        });
        Ok(body.boxed())
    }

    async fn write<B: Chunks>(&self, name: &str, mut body: B) -> Result<(), Error> {
        let temp = self.path(&format!(
            ".{name}.{:016x}{PARTIAL_SUFFIX}",
            rand::random::<u64>()
        ));
        let result: Result<(), Error> = async {
            let mut file = File::create(&temp).await?;
            while let Some(chunk) = body.next().await {
                file.write_all(&chunk?).await?;
            }
            file.sync_all().await?;
            fs::rename(&temp, self.path(name)).await?;
            Ok(())
        }
        .await;
        if result.is_err() {
            let _ = fs::remove_file(&temp).await;
        }
        result
    }
}

impl List for Directory {
    async fn list(&self) -> Result<Vec<String>, Error> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }
}
