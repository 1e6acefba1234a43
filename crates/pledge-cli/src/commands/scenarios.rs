//! `pledge scenarios` — Run the reference promise scenarios.

use clap::{Args, ValueEnum};
use pledge_core::{Promise, Scheduler};

use crate::config::PledgeConfig;

#[derive(Args, Debug)]
pub struct ScenariosArgs {
    /// Run a single scenario instead of all of them.
    #[arg(long, value_enum)]
    pub only: Option<Scenario>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Value flows through two then() links; the last value goes unconsumed.
    A,
    /// Rejection recovered by catch, then continued.
    B,
    /// Second fulfill is refused; the first value still arrives.
    C,
    /// Executor failure becomes a rejection.
    Throws,
    /// Two levels of adoption.
    Adopt,
}

const ALL: [Scenario; 5] = [
    Scenario::A,
    Scenario::B,
    Scenario::C,
    Scenario::Throws,
    Scenario::Adopt,
];

pub fn run(args: &ScenariosArgs, config: &PledgeConfig) -> anyhow::Result<()> {
    let selected: Vec<Scenario> = match args.only {
        Some(one) => vec![one],
        None => ALL.to_vec(),
    };

    for scenario in selected {
        let scheduler = Scheduler::from_config(&config.runtime());
        match scenario {
            Scenario::A => value_chain(&scheduler)?,
            Scenario::B => recover(&scheduler)?,
            Scenario::C => double_fulfill(&scheduler)?,
            Scenario::Throws => executor_fails(&scheduler)?,
            Scenario::Adopt => adopt(&scheduler)?,
        }
        let ran = scheduler.run_until_idle()?;
        tracing::debug!(?scenario, ran, "scenario drained");
        println!();
    }

    Ok(())
}

fn value_chain(scheduler: &Scheduler) -> anyhow::Result<()> {
    println!("Scenario A: fulfilled root, two then() links");
    let root = Promise::<i32, String>::new(scheduler, |settle| {
        settle.fulfill(0).map_err(|e| e.to_string())
    });
    let _tail = root
        .then(|value| {
            println!("  root: fulfilled with {} -- should be: 0", value);
            Ok("s")
        })?
        .then(|value| {
            println!("  then(): fulfilled with {:?} -- should be: \"s\"", value);
            Ok(123)
        })?;
    println!("  (nothing printed yet: continuations are deferred)");
    scheduler.run_until_idle()?;
    println!("  expect an unhandled-fulfillment diagnostic for 123");
    Ok(())
}

fn recover(scheduler: &Scheduler) -> anyhow::Result<()> {
    println!("Scenario B: rejected root, catch() then then()");
    let root = Promise::<i32, String>::new(scheduler, |settle| {
        settle.reject("boom".to_string()).map_err(|e| e.to_string())
    });
    let _tail = root
        .catch_only(|reason| {
            println!("  root: rejected with {:?} -- should be: \"boom\"", reason);
            Ok(1)
        })?
        .then(|value| {
            println!("  catch(): fulfilled with {} -- should be: 1", value);
            Ok(())
        })?;
    Ok(())
}

fn double_fulfill(scheduler: &Scheduler) -> anyhow::Result<()> {
    println!("Scenario C: fulfill() called twice");
    let root = Promise::<i32, String>::new(scheduler, |settle| {
        settle.fulfill(42).map_err(|e| e.to_string())?;
        match settle.fulfill(43) {
            Ok(()) => println!("  second fulfill() was accepted -- should have failed"),
            Err(err) => println!("  second fulfill() refused: {}", err),
        }
        Ok(())
    });
    let _tail = root.then(|value| {
        println!("  root: fulfilled with {} -- should be: 42", value);
        Ok(())
    })?;
    Ok(())
}

fn executor_fails(scheduler: &Scheduler) -> anyhow::Result<()> {
    println!("Scenario: executor returns an error");
    let root = Promise::<(), String>::new(scheduler, |_settle| {
        Err("forced error from executor".to_string())
    });
    let _tail = root.catch_only(|reason| {
        println!("  root: rejected with {:?} -- should be: \"forced error from executor\"", reason);
        Ok(())
    })?;
    Ok(())
}

fn adopt(scheduler: &Scheduler) -> anyhow::Result<()> {
    println!("Scenario: root adopts a promise that adopts a pending one");
    let (innermost, innermost_settle) = Promise::<i32, String>::deferred(scheduler);
    let middle = Promise::<i32, String>::new(scheduler, |settle| {
        settle.resolve(innermost).map_err(|e| e.to_string())
    });
    let root = Promise::<i32, String>::new(scheduler, |settle| {
        settle.resolve(middle).map_err(|e| e.to_string())
    });
    let _tail = root.then(|value| {
        println!("  root: fulfilled with {} -- should be: 7", value);
        Ok(())
    })?;

    scheduler.run_until_idle()?;
    println!("  root state before the innermost settles: {}", root.state());
    innermost_settle.fulfill(7)?;
    Ok(())
}
