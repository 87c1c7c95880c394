use crate::Error;
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time as exchanged with consumers: seconds and nanoseconds since the UNIX epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl TryFrom<SystemTime> for Timestamp {
    type Error = Error;

    fn try_from(time: SystemTime) -> Result<Self, Self::Error> {
        let elapsed = time
            .duration_since(UNIX_EPOCH)
            .map_err(|_| Error::InvalidTimestamp)?;
        let seconds = i64::try_from(elapsed.as_secs()).map_err(|_| Error::InvalidTimestamp)?;
        Ok(Self {
            seconds,
            nanos: elapsed.subsec_nanos() as i32,
        })
    }
}

/// Last irreversible block and head block, as seen by one source at one instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadSnapshot {
    pub lib_num: u64,
    pub lib_id: String,
    pub head_num: u64,
    pub head_id: String,
    pub head_time: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_timestamp_from_system_time() {
        let time = UNIX_EPOCH + Duration::new(1_600_000_000, 500);
        let timestamp = Timestamp::try_from(time).unwrap();
        assert_eq!(
            timestamp,
            Timestamp {
                seconds: 1_600_000_000,
                nanos: 500
            }
        );
    }

    #[test]
    fn test_timestamp_before_epoch() {
        let time = UNIX_EPOCH - Duration::from_secs(1);
        assert_eq!(Timestamp::try_from(time), Err(Error::InvalidTimestamp));
    }
}
