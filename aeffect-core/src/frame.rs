//! The handler frame model (component A).
//!
//! A [`Frame`] is a node of the handler shadow stack: a tagged-sum record
//! with a common header (`parent`, `prompt`, `kind`) and data specific to
//! the three frame shapes the engine installs — user handlers, `under`
//! markers and `mask` markers.
//!
//! Frames are reference-counted (`Arc`) rather than stored in a raw arena
//! addressed by index. A generational arena is how the substrate this
//! engine is modeled on stores frames (stable handles over reusable
//! storage), but it exists there to dodge manual memory management in C;
//! `Arc` gives the same stable-handle property in safe Rust directly, so
//! there is no reason to reintroduce an index layer on top of it.

use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ids::PromptId;
use crate::kind::Kind;

/// Type-erased handler-local data, boxed for prompt-owned frames or
/// borrowed for linear ones.
pub(crate) enum HData {
    /// Storage the frame itself owns, allocated fresh at install time and
    /// dropped with the frame. Used by prompt handlers (§4.4).
    Owned(Mutex<Box<dyn Any + Send>>),
    /// Caller-owned storage, borrowed for the dynamic extent of a linear
    /// handler's call (§4.3). `live` flips to `false` before the borrow
    /// ends, so a handle retained past that point reports staleness
    /// instead of touching a dangling pointer.
    Borrowed {
        ptr: std::ptr::NonNull<()>,
        type_id: TypeId,
        live: Arc<AtomicBool>,
    },
    /// Marker frames (`under`/`mask`) carry no handler-local data at all.
    None,
}

// `HData::Borrowed` is only ever constructed from a `&mut T: Send` borrow
// that outlives the frame by construction (see `scope::under`'s caller,
// `linear::linear_handler`), and every access is gated on `live`.
unsafe impl Send for HData {}
unsafe impl Sync for HData {}

pub(crate) enum FrameVariant {
    User,
    Under { target: Kind },
    Mask { target: Kind, from: u32 },
}

pub(crate) struct FrameCell {
    parent: Mutex<Option<Frame>>,
    pub(crate) prompt: Option<PromptId>,
    pub(crate) kind: Kind,
    pub(crate) variant: FrameVariant,
    hdata: HData,
}

/// A handle to an installed handler frame.
///
/// Cloning a `Frame` is cheap and never invalidates it; a frame is kept
/// alive by every handle that still points to it, including ones held by
/// a captured continuation that has not yet been resumed.
pub type Frame = Arc<FrameCell>;

impl FrameCell {
    pub(crate) fn new_user(
        parent: Option<Frame>,
        prompt: Option<PromptId>,
        kind: Kind,
        hdata: HData,
    ) -> Frame {
        Arc::new(FrameCell {
            parent: Mutex::new(parent),
            prompt,
            kind,
            variant: FrameVariant::User,
            hdata,
        })
    }

    pub(crate) fn new_under(parent: Option<Frame>, target: Kind) -> Frame {
        Arc::new(FrameCell {
            parent: Mutex::new(parent),
            prompt: None,
            kind: crate::kind::UNDER,
            variant: FrameVariant::Under { target },
            hdata: HData::None,
        })
    }

    pub(crate) fn new_mask(parent: Option<Frame>, target: Kind, from: u32) -> Frame {
        Arc::new(FrameCell {
            parent: Mutex::new(parent),
            prompt: None,
            kind: crate::kind::MASK,
            variant: FrameVariant::Mask { target, from },
            hdata: HData::None,
        })
    }

    pub(crate) fn parent(&self) -> Option<Frame> {
        self.parent.lock().clone()
    }

    pub(crate) fn set_parent(&self, new_parent: Option<Frame>) {
        *self.parent.lock() = new_parent;
    }
}

/// Read a prompt handler frame's handler-local data as `&mut dyn Any`,
/// running `f` with it, without committing to a concrete type the way
/// [`with_data`] does.
///
/// Used by the unwind transport (§4.8) to run an unwind-fn at a target
/// prompt's catch site while its handler-local data is still live: at
/// that point the crate only knows the frame's erased `dyn Any`, not the
/// `T` its owning [`crate::prompt::prompt_handler`] was instantiated
/// with.
///
/// # Panics
///
/// Panics if the frame carries no owned handler-local data (a marker
/// frame, or a linear handler's borrowed data).
pub(crate) fn with_data_dyn<R>(frame: &Frame, f: impl FnOnce(&mut dyn Any) -> R) -> R {
    match &frame.hdata {
        HData::Owned(mutex) => {
            let mut guard = mutex.lock();
            f(&mut **guard)
        }
        HData::Borrowed { .. } => panic!("with_data_dyn called on a linear handler's frame"),
        HData::None => panic!("marker frame carries no handler-local data"),
    }
}

/// Read the frame's handler-local data as `&mut T`, running `f` with it.
///
/// # Panics
///
/// Panics if `T` does not match the type the frame was installed with, if
/// the frame carries no handler-local data (an `under`/`mask` marker), or
/// if the frame is a linear handler's and its call has already returned.
pub fn with_data<T: 'static, R>(frame: &Frame, f: impl FnOnce(&mut T) -> R) -> R {
    match &frame.hdata {
        HData::Owned(mutex) => {
            let mut guard = mutex.lock();
            let data = guard
                .downcast_mut::<T>()
                .expect("handler-local data type mismatch");
            f(data)
        }
        HData::Borrowed {
            ptr,
            type_id,
            live,
        } => {
            assert!(
                live.load(Ordering::Acquire),
                "stale handle: linear handler frame is no longer installed"
            );
            assert_eq!(
                *type_id,
                TypeId::of::<T>(),
                "handler-local data type mismatch"
            );
            // SAFETY: `live` is checked above; it only flips to `false`
            // after the borrow `ptr` points into has ended, and that flip
            // happens-before any later load via the `Release`/`Acquire`
            // pair in `linear::linear_handler`.
            let data = unsafe { &mut *ptr.as_ptr().cast::<T>() };
            f(data)
        }
        HData::None => panic!("marker frame carries no handler-local data"),
    }
}

impl FrameVariant {
    pub(crate) fn under_target(&self) -> Kind {
        match self {
            FrameVariant::Under { target } => *target,
            _ => unreachable!("under_target called on a non-under frame"),
        }
    }

    pub(crate) fn mask_fields(&self) -> (Kind, u32) {
        match self {
            FrameVariant::Mask { target, from } => (*target, *from),
            _ => unreachable!("mask_fields called on a non-mask frame"),
        }
    }
}
