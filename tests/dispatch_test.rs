#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use promise_kit::runtime::{self, Dispatch, Job};
    use promise_kit::{join, run_async, Error, ExecutionContext, Promise};
    use std::io;
    use std::sync::{Arc, Mutex, OnceLock};
    use std::thread;

    /// Host runtime that records which submission point each job used and
    /// runs it on a fresh thread.
    #[derive(Default)]
    struct Recording {
        submissions: Mutex<Vec<String>>,
    }

    impl Recording {
        fn run(&self, target: String, job: Job) {
            self.submissions.lock().unwrap().push(target);
            thread::spawn(job);
        }

        fn count(&self, target: &str) -> usize {
            self.submissions
                .lock()
                .unwrap()
                .iter()
                .filter(|t| *t == target)
                .count()
        }
    }

    impl Dispatch for Recording {
        fn submit_default(&self, job: Job) {
            self.run("default".into(), job)
        }

        fn submit_main(&self, job: Job) {
            self.run("main".into(), job)
        }

        fn submit_named(&self, queue: &str, job: Job) {
            self.run(format!("named:{}", queue), job)
        }
    }

    fn recording() -> &'static Recording {
        static HOST: OnceLock<Arc<Recording>> = OnceLock::new();
        HOST.get_or_init(|| {
            let _ = env_logger::builder().is_test(true).try_init();
            let host = Arc::new(Recording::default());
            runtime::install(host.clone()).expect("first install succeeds");
            host
        })
    }

    #[test]
    fn test_second_install_is_rejected() {
        recording();
        let again = runtime::install(Arc::new(Recording::default()));
        assert!(matches!(again, Err(Error::AlreadyInstalled)));
    }

    #[test]
    fn test_then_on_routes_to_each_context() {
        let host = recording();
        let (promise, future) = Promise::<u32>::new();
        let main = future.then_on(ExecutionContext::Main, |n| n + 1);
        let named = future.then_on(ExecutionContext::named("images"), |n| n + 2);
        let inline = future.then(|n| n + 3);
        promise.complete(10);

        assert_eq!(inline.peek().and_then(|o| o.into_value()), Some(13));
        assert_eq!(block_on(main.outcome()).into_value(), Some(11));
        assert_eq!(block_on(named.outcome()).into_value(), Some(12));
        assert!(host.count("main") >= 1);
        assert!(host.count("named:images") >= 1);
    }

    #[test]
    fn test_run_async_uses_default_pool() {
        let host = recording();
        let before = host.count("default");
        let future = run_async(|| Ok::<_, io::Error>("loaded"));
        assert_eq!(block_on(future.outcome()).into_value(), Some("loaded"));
        assert!(host.count("default") > before);
    }

    #[test]
    fn test_error_and_finally_are_not_dispatched() {
        let host = recording();
        let (promise, future) = Promise::<u32>::new();
        let before = host.count("named:never");
        let hits = Arc::new(Mutex::new(Vec::new()));
        let (h1, h2) = (hits.clone(), hits.clone());
        future
            .error(move |err| h1.lock().unwrap().push(err.to_string()))
            .finally(move || h2.lock().unwrap().push("finally".to_owned()));
        promise.complete_with_error(promise_kit::DomainError::new(io::Error::other("denied")));
        assert_eq!(*hits.lock().unwrap(), vec!["denied".to_owned(), "finally".to_owned()]);
        assert_eq!(host.count("named:never"), before);
    }

    #[test]
    fn test_chain_across_contexts_into_join() {
        recording();
        let a = run_async(|| Ok::<_, io::Error>(2u32)).then_on(ExecutionContext::Main, |n| n * 10);
        let b = run_async(|| Ok::<_, io::Error>("b"))
            .and_then_on(ExecutionContext::named("chain"), |s| {
                run_async(move || Ok::<_, io::Error>(s.len()))
            });
        let joined = join!(a, b);
        assert!(block_on(joined.outcome()).is_success());
        assert_eq!(a.peek().and_then(|o| o.into_value()), Some(20));
        assert_eq!(b.peek().and_then(|o| o.into_value()), Some(1));
    }
}
