use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// Coalesces redraw requests into one `requestAnimationFrame` callback.
///
/// Cloning yields another handle to the same scheduler, so tile loads, widget mutations and
/// window resizes can all ask for a frame.
#[derive(Clone)]
pub struct RedrawScheduler {
    inner: Rc<Inner>,
}

struct Inner {
    window: Option<web_sys::Window>,
    pending: Cell<Option<i32>>,
    callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl RedrawScheduler {
    pub fn new(render_fn: impl Fn() + 'static) -> Self {
        let inner = Rc::new(Inner {
            window: web_sys::window(),
            pending: Cell::new(None),
            callback: RefCell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let cb = Closure::<dyn FnMut()>::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.pending.set(None);
            }
            render_fn();
        });
        *inner.callback.borrow_mut() = Some(cb);

        Self { inner }
    }

    /// Ask for a repaint on the next frame. Repeated calls before it fires are no-ops.
    pub fn request(&self) {
        if self.inner.pending.get().is_some() {
            return;
        }
        let Some(window) = self.inner.window.as_ref() else {
            return;
        };
        let callback = self.inner.callback.borrow();
        let Some(cb) = callback.as_ref() else {
            return;
        };
        if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            self.inner.pending.set(Some(id));
        }
    }

    /// Redraw hook for code that only needs to trigger frames.
    pub fn as_redraw(&self) -> Rc<dyn Fn()> {
        let this = self.clone();
        Rc::new(move || this.request())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(id) = self.pending.take()
            && let Some(window) = self.window.as_ref()
        {
            let _ = window.cancel_animation_frame(id);
        }
    }
}
