//! `pledge coalesce` — Many callers, one refresh.
//!
//! Each round issues several concurrent token requests through a
//! [`Coalescer`], waits for all of them with [`all`], and then lets the
//! simulated server answer the single refresh it received.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use clap::Args;
use pledge_compose::{all, Coalescer};
use pledge_core::{Promise, Scheduler, Settle};

use crate::config::PledgeConfig;

#[derive(Args, Debug)]
pub struct CoalesceArgs {
    /// Concurrent callers per round.
    #[arg(long, default_value_t = 3)]
    pub callers: usize,

    /// Number of rounds.
    #[arg(long, default_value_t = 3)]
    pub rounds: usize,
}

pub fn run(args: &CoalesceArgs, config: &PledgeConfig) -> anyhow::Result<()> {
    let scheduler = Scheduler::from_config(&config.runtime());
    let counter = Rc::new(Cell::new(0u32));
    let server: Rc<RefCell<Option<Settle<String, String>>>> = Rc::new(RefCell::new(None));

    let refresh = {
        let counter = Rc::clone(&counter);
        let server = Rc::clone(&server);
        let inner = scheduler.clone();
        Coalescer::new(&scheduler, move || {
            println!("  called refresh, counter: {}", counter.get());
            let (promise, settle) = Promise::deferred(&inner);
            *server.borrow_mut() = Some(settle);
            promise
        })
    };

    for round in 0..args.rounds {
        println!("run={}: call {}x refresh in parallel", round, args.callers);
        let requests = (0..args.callers)
            .map(|_| refresh.call())
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(round, waiting = refresh.waiting(), "requests issued");

        let tokens = Rc::new(RefCell::new(None));
        let out = Rc::clone(&tokens);
        let _collected = all(&scheduler, requests)?.then(move |values| {
            *out.borrow_mut() = Some(values);
            Ok(())
        })?;

        // The server answers once every caller is queued.
        let settle = server
            .borrow_mut()
            .take()
            .ok_or_else(|| anyhow::anyhow!("no refresh reached the server"))?;
        settle.fulfill(format!("token:{}", counter.get()))?;
        counter.set(counter.get() + 1);
        scheduler.run_until_idle()?;

        let tokens = tokens
            .borrow_mut()
            .take()
            .ok_or_else(|| anyhow::anyhow!("round {} did not complete", round))?;
        println!("run={}: all access tokens: {:?}", round, tokens);
        if !tokens.iter().all(|token| token == &tokens[0]) {
            anyhow::bail!("tokens must all be the same");
        }
    }

    Ok(())
}
