//! Joining the engine tasks of a run.

use std::error::Error;
use tokio::task::JoinHandle;

async fn await_task<T, E>(
    task: Option<JoinHandle<Result<T, E>>>,
) -> Result<Option<T>, Box<dyn Error>>
where
    E: Error + 'static,
{
    match task {
        Some(handle) => Ok(Some(handle.await??)),
        None => Ok(None),
    }
}

/// Wait for both tasks, then report the first failure.
///
/// The second task is always awaited, so its transaction has committed or
/// rolled back by the time an error from the first one is returned.
pub(crate) async fn join_engines<A, B, E>(
    first: Option<JoinHandle<Result<A, E>>>,
    second: Option<JoinHandle<Result<B, E>>>,
) -> Result<(Option<A>, Option<B>), Box<dyn Error>>
where
    E: Error + 'static,
{
    let first = await_task(first).await;
    let second = await_task(second).await;
    Ok((first?, second?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::task;

    #[tokio::test]
    async fn test_failure_waits_for_other_task() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let failing = task::spawn_blocking(|| Err::<u32, _>(std::fmt::Error));
        let slow = task::spawn_blocking(move || {
            std::thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::SeqCst);
            Ok::<_, std::fmt::Error>("done")
        });

        let joined = join_engines(Some(failing), Some(slow)).await;
        assert!(joined.is_err());
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_absent_tasks_are_none() {
        let only = task::spawn_blocking(|| Ok::<_, std::fmt::Error>(7));
        let (first, second) = join_engines::<u32, (), _>(Some(only), None).await.unwrap();
        assert_eq!(first, Some(7));
        assert!(second.is_none());
    }
}
