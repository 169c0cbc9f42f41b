// reginit.rs - Process-wide initialization.
// A done flag that can be read without locking, with the actual setup
// serialized under one mutex.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::RegexError;
use crate::oniguruma::ONIG_NORMAL;
use crate::regenc::OnigEncoding;

static INITIALIZED: AtomicBool = AtomicBool::new(false);
/// Names of the encodings whose `init` has run.
static INIT_ENCODINGS: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

/// Initialize the library for `encodings`. Safe to call any number of times
/// from any thread; each encoding is set up once.
pub fn onig_initialize(encodings: &[OnigEncoding]) -> Result<(), RegexError> {
    let mut done = INIT_ENCODINGS
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    for &enc in encodings {
        let name = enc.name();
        if done.contains(&name) {
            continue;
        }
        let r = enc.init();
        if r != ONIG_NORMAL {
            return Err(RegexError::from(r));
        }
        done.push(name);
        log::debug!("initialized encoding {}", name);
    }
    INITIALIZED.store(true, Ordering::Release);
    Ok(())
}

pub fn onig_is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

fn is_encoding_initialized(enc: OnigEncoding) -> bool {
    INIT_ENCODINGS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&enc.name())
}

/// Run `onig_initialize` for `enc` unless that already happened.
pub(crate) fn onig_ensure_initialized(enc: OnigEncoding) -> Result<(), RegexError> {
    if onig_is_initialized() && is_encoding_initialized(enc) {
        return Ok(());
    }
    onig_initialize(&[enc])
}
