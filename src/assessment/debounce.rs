use actix::prelude::*;
use std::time::Duration;

/// Actor side of a [`Debouncer`]: where the debouncer lives and what happens
/// when the quiet period closes.
pub trait Debounce<M: 'static>: Actor<Context = Context<Self>> {
    fn debouncer(&mut self) -> &mut Debouncer<M>;

    fn quiet_period_elapsed(&mut self, value: M, ctx: &mut Context<Self>);
}

struct Pending<M> {
    token: u64,
    handle: SpawnHandle,
    value: M,
}

/// Keeps at most one scheduled value per owner. Scheduling again cancels the
/// previous timer and drops its value.
pub struct Debouncer<M> {
    quiet_period: Duration,
    next_token: u64,
    pending: Option<Pending<M>>,
}

impl<M: 'static> Debouncer<M> {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            next_token: 0,
            pending: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn schedule<A: Debounce<M>>(&mut self, value: M, ctx: &mut Context<A>) {
        if self.cancel(ctx) {
            log::trace!("Debounce timer reset");
        }
        self.next_token += 1;
        let token = self.next_token;
        let handle = ctx.run_later(self.quiet_period, move |act, ctx| {
            if let Some(value) = act.debouncer().take(token) {
                act.quiet_period_elapsed(value, ctx);
            }
        });
        self.pending = Some(Pending { token, handle, value });
    }

    /// Cancels the pending timer, if any. Returns whether one was dropped.
    pub fn cancel<A>(&mut self, ctx: &mut Context<A>) -> bool
    where
        A: Actor<Context = Context<A>>,
    {
        match self.pending.take() {
            Some(pending) => {
                ctx.cancel_future(pending.handle);
                true
            }
            None => false,
        }
    }

    fn take(&mut self, token: u64) -> Option<M> {
        match &self.pending {
            Some(pending) if pending.token == token => self.pending.take().map(|p| p.value),
            _ => None,
        }
    }
}
