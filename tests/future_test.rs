#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use promise_kit::{join, Fault, Future, Outcome, OutcomeKind, Promise};
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_many_consumers_one_producer() {
        init();
        let (promise, future) = Promise::<String>::new();
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let future = future.clone();
                thread::spawn(move || block_on(future.outcome()))
            })
            .collect();
        let producer = thread::spawn(move || promise.complete("🍓".into()));
        producer.join().expect("The producer thread has panicked");
        for consumer in consumers {
            let outcome = consumer.join().expect("The consumer thread has panicked");
            assert_eq!(outcome.into_value().as_deref(), Some("🍓"));
        }
    }

    #[test]
    fn test_registration_races_resolution() {
        init();
        for _ in 0..50 {
            let (promise, future) = Promise::<u32>::new();
            let fired = Arc::new(AtomicUsize::new(0));
            let barrier = Arc::new(Barrier::new(3));

            let registrars: Vec<_> = (0..2)
                .map(|_| {
                    let (future, fired, barrier) = (future.clone(), fired.clone(), barrier.clone());
                    thread::spawn(move || {
                        barrier.wait();
                        for _ in 0..10 {
                            let fired = fired.clone();
                            future.finally(move || {
                                fired.fetch_add(1, Ordering::SeqCst);
                            });
                        }
                    })
                })
                .collect();
            barrier.wait();
            promise.complete(1);
            for registrar in registrars {
                registrar.join().expect("The registrar thread has panicked");
            }
            assert_eq!(fired.load(Ordering::SeqCst), 20);
        }
    }

    #[test]
    fn test_racing_completions_store_one_outcome() {
        init();
        let (promise, future) = Promise::<usize>::new();
        let promise = Arc::new(promise);
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        future.finally(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let winners: usize = (0..8)
            .map(|i| {
                let promise = promise.clone();
                thread::spawn(move || promise.complete(i) as usize)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().expect("The completing thread has panicked"))
            .sum();
        assert_eq!(winners, 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(future.peek().unwrap().is_success());
    }

    #[test]
    fn test_failure_terminates_at_matching_handler() {
        init();
        let caught = Arc::new(AtomicUsize::new(0));
        let c = caught.clone();
        let chained = Future::<u32>::failure(io::Error::other("E"))
            .then(|x| x + 1)
            .then(|x| x.to_string());
        chained.error(move |err| {
            assert_eq!(err.to_string(), "E");
            c.fetch_add(1, Ordering::SeqCst);
        });
        chained.fault(|_| panic!("a domain error is not a fault"));
        assert_eq!(caught.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_join_three_with_one_failure() {
        init();
        let (pa, a) = Promise::<u8>::new();
        let (pb, b) = Promise::<&'static str>::new();
        let (pc, c) = Promise::<()>::new();
        let joined = join!(a, b, c);

        let t1 = thread::spawn(move || pa.complete(1));
        let t2 = thread::spawn(move || pb.complete_with_fault(Fault::new("disk on fire")));
        let t3 = thread::spawn(move || pc.complete(()));
        for t in [t1, t2, t3] {
            t.join().expect("The completing thread has panicked");
        }

        let outcome = block_on(joined.outcome());
        assert_eq!(outcome.kind(), OutcomeKind::DomainError);
        assert_eq!(
            outcome.domain_error().map(ToString::to_string).as_deref(),
            Some("1 of 3 joined futures failed")
        );
    }

    #[test]
    fn test_abandoned_producer_cancels_chain() {
        init();
        let (promise, future) = Promise::<u32>::new();
        let chained = future.then(|x| x * 2);
        let producer = thread::spawn(move || {
            let _promise = promise;
        });
        producer.join().expect("The producer thread has panicked");
        assert!(matches!(block_on(chained.outcome()), Outcome::Cancelled));
    }
}
