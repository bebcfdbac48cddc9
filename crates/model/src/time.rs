/// The current time in seconds since the unix epoch.
pub fn now_in_epoch_seconds() -> u64 {
    u64::try_from(chrono::offset::Utc::now().timestamp()).unwrap_or_default()
}
