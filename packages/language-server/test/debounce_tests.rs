//! Debouncer Tests

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use nextflow_language_server::debounce::Debouncer;

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_collapse_rapid_submissions_into_one_run() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(40)));
        let runs = counter();
        for _ in 0..5 {
            let runs = Arc::clone(&runs);
            debouncer.execute_later("analysis", move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_keep_independent_keys_independent() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(20)));
        let runs = counter();
        for key in ["a", "b"] {
            let runs = Arc::clone(&runs);
            debouncer.execute_later(key, move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_run_immediately_on_demand_and_cancel_pending_timers() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(40)));
        let later_runs = counter();
        let now_runs = counter();
        {
            let later_runs = Arc::clone(&later_runs);
            debouncer.execute_later("analysis", move || async move {
                later_runs.fetch_add(1, Ordering::SeqCst);
            });
        }
        {
            let now_runs = Arc::clone(&now_runs);
            debouncer
                .execute_now("analysis", move || async move {
                    now_runs.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }
        assert_eq!(now_runs.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_millis(150)).await;
        // The pending timer was superseded by the immediate run.
        assert_eq!(later_runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_reject_submissions_after_shutdown() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(10)));
        debouncer.shutdown();
        let runs = counter();
        {
            let runs = Arc::clone(&runs);
            debouncer.execute_later("analysis", move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }
        {
            let runs = Arc::clone(&runs);
            debouncer
                .execute_now("analysis", move || async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_drop_pending_timers_on_shutdown() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(40)));
        let runs = counter();
        {
            let runs = Arc::clone(&runs);
            debouncer.execute_later("analysis", move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }
        debouncer.shutdown();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
