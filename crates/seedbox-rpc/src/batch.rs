//! Fan-in for batch requests.
//!
//! Each of the N calls in a batch gets a responder that writes into its own
//! slot. The call that brings the completed count to N compacts the slots,
//! dropping notification gaps, and fires the batch's final responder.

use crate::continuation::Responder;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct BatchContext {
    slots: Mutex<Vec<Option<Value>>>,
    remaining: AtomicUsize,
    done: Mutex<Option<Responder>>,
}

impl BatchContext {
    pub fn new(size: usize, done: Responder) -> Arc<Self> {
        Arc::new(Self {
            slots: Mutex::new(vec![None; size]),
            remaining: AtomicUsize::new(size),
            done: Mutex::new(Some(done)),
        })
    }

    /// Responder for the call at `index` in the original batch.
    pub fn responder(self: &Arc<Self>, index: usize) -> Responder {
        let ctx = Arc::clone(self);
        Box::new(move |response| ctx.fill(index, response))
    }

    fn fill(&self, index: usize, response: Option<Value>) {
        {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(slot) = slots.get_mut(index) {
                *slot = response;
            }
        }

        if self.remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }

        let slots = std::mem::take(&mut *self.slots.lock().unwrap_or_else(|e| e.into_inner()));
        let responses: Vec<Value> = slots.into_iter().flatten().collect();
        debug!("batch complete with {} responses", responses.len());

        let done = self.done.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(done) = done {
            done((!responses.is_empty()).then_some(Value::Array(responses)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn capture() -> (Arc<Mutex<Vec<Option<Value>>>>, Responder) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, Box::new(move |v| sink.lock().unwrap().push(v)))
    }

    #[test]
    fn test_out_of_order_completion_keeps_positions() {
        let (seen, done) = capture();
        let ctx = BatchContext::new(3, done);
        let responders: Vec<Responder> = (0..3).map(|i| ctx.responder(i)).collect();
        let mut responders: Vec<Option<Responder>> = responders.into_iter().map(Some).collect();

        (responders[2].take().unwrap())(Some(json!("c")));
        (responders[0].take().unwrap())(Some(json!("a")));
        assert!(seen.lock().unwrap().is_empty());
        (responders[1].take().unwrap())(None);

        assert_eq!(*seen.lock().unwrap(), vec![Some(json!(["a", "c"]))]);
    }

    #[test]
    fn test_all_notifications_yield_nothing() {
        let (seen, done) = capture();
        let ctx = BatchContext::new(2, done);
        (ctx.responder(0))(None);
        (ctx.responder(1))(None);
        assert_eq!(*seen.lock().unwrap(), vec![None]);
    }

    #[test]
    fn test_concurrent_completion() {
        let (seen, done) = capture();
        let ctx = BatchContext::new(32, done);
        let threads: Vec<_> = (0..32)
            .map(|i| {
                let responder = ctx.responder(i);
                std::thread::spawn(move || responder(Some(json!(i))))
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let expected: Vec<Value> = (0..32).map(|i| json!(i)).collect();
        assert_eq!(seen[0], Some(Value::Array(expected)));
    }
}
