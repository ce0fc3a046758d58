use crate::usecase::ports::repo::RepoError;

/// Runs a blocking storage call on the blocking pool so the UI and timers
/// keep running while SQLite works.
pub async fn run_blocking<F, T>(f: F) -> Result<T, RepoError>
where
    F: FnOnce() -> Result<T, RepoError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| RepoError::Message(format!("storage task stopped: {err}")))?
}
