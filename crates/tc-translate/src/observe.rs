//! Best-effort observer hooks fired by the translation loop.

use tc_core::prompt::Prompt;

/// Callbacks fired on prompt send, completion receipt, and repair.
///
/// Observers run synchronously in registration order. A failing observer is
/// logged and discarded; it never aborts the loop and never prevents the
/// observers after it from running.
pub trait TranslationObserver: Send + Sync {
    fn on_send(&self, prompt: &Prompt) -> anyhow::Result<()> {
        let _ = prompt;
        Ok(())
    }

    fn on_response(&self, raw: &str) -> anyhow::Result<()> {
        let _ = raw;
        Ok(())
    }

    fn on_repair(&self, attempt: u32, diagnostic: &str) -> anyhow::Result<()> {
        let _ = (attempt, diagnostic);
        Ok(())
    }
}

pub(crate) fn notify<F>(observers: &[Box<dyn TranslationObserver>], mut f: F)
where
    F: FnMut(&dyn TranslationObserver) -> anyhow::Result<()>,
{
    for observer in observers {
        if let Err(err) = f(observer.as_ref()) {
            tracing::warn!("translation observer failed: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Failing;

    impl TranslationObserver for Failing {
        fn on_response(&self, _raw: &str) -> anyhow::Result<()> {
            anyhow::bail!("observer exploded")
        }
    }

    struct Counting {
        responses: Arc<AtomicU32>,
    }

    impl TranslationObserver for Counting {
        fn on_response(&self, _raw: &str) -> anyhow::Result<()> {
            self.responses.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn failure_does_not_starve_later_observers() {
        let responses = Arc::new(AtomicU32::new(0));
        let observers: Vec<Box<dyn TranslationObserver>> = vec![
            Box::new(Failing),
            Box::new(Counting {
                responses: responses.clone(),
            }),
        ];

        notify(&observers, |o| o.on_response("raw text"));
        assert_eq!(responses.load(Ordering::SeqCst), 1);
    }
}
