//! iOS adapters: `AVAudioSession`, an off-screen `MPVolumeView`, and the
//! main dispatch queue.
//!
//! # Volume observation
//!
//! `outputVolume` is observed by polling on a background thread and diffing
//! against the last value.  Each registered observer gets its seed change on
//! registration; later changes are delivered on the main queue.  Polling
//! avoids declaring a key-value-observing Objective-C class at runtime.
//!
//! Every poller thread carries the generation it was spawned with.  Removing
//! the last observer bumps the generation, so a thread still asleep when the
//! monitor restarts exits on wake instead of polling next to its successor.
//!
//! # Notifications
//!
//! Interruption and lifecycle notifications are not observed here.  See
//! [`ios_platform`] for what the host application must forward.
//!
//! # Threading
//!
//! UIKit objects must only be touched on the main thread.  Volume changes,
//! scheduled tasks and (by contract) forwarded notifications all run on the
//! main queue, so the monitor's handlers and the user callbacks do too.
//! [`IosVolumeSurface`] still hops to the main queue when called from any
//! other thread.  Raw object pointers are stored as `usize` so the adapters
//! stay `Send + Sync`.

use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use objc::runtime::{Class, Object, BOOL, NO, YES};
use objc::{class, msg_send, sel, sel_impl, Encode, Encoding};
use tracing::{debug, warn};
use uuid::Uuid;
use volume_core::VolumeChange;

use crate::application::monitor::MonitorPlatform;
use crate::application::platform::{
    AudioSession, MainTask, MainThreadScheduler, ObserverToken, SessionError, VolumeHandler,
    VolumeSurface,
};
use crate::infrastructure::notifications::LocalNotificationCenter;

/// How often the poller samples `outputVolume`.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// `AVAudioSessionCategoryOptionMixWithOthers`.
const MIX_WITH_OTHERS: usize = 0x1;

/// `UIControlEventValueChanged`.
const CONTROL_EVENT_VALUE_CHANGED: usize = 1 << 12;

/// `NSUTF8StringEncoding`.
const UTF8_ENCODING: usize = 4;

/// Builds the iOS [`MonitorPlatform`].
///
/// The platform does not subscribe to `NSNotificationCenter` itself.  The
/// host application must post into `notifications`, on the main thread:
///
/// | host event | post |
/// |---|---|
/// | interruption began | `PlatformNotification::Interruption(InterruptionPhase::Began)` |
/// | interruption ended | `PlatformNotification::Interruption(InterruptionPhase::Ended)` |
/// | will resign active | `PlatformNotification::AppActivity(AppActivity::Inactive)` |
/// | did become active | `PlatformNotification::AppActivity(AppActivity::Active)` |
///
/// The interruption events come from `AVAudioSessionInterruptionNotification`
/// and the others from the matching `UIApplication` notifications.
///
/// Without these the monitor never rebaselines on return to the foreground
/// and never reactivates the session after a phone call.
pub fn ios_platform(notifications: Arc<LocalNotificationCenter>) -> MonitorPlatform {
    MonitorPlatform {
        session: Arc::new(IosAudioSession::new()),
        surface: Arc::new(IosVolumeSurface::new()),
        notifications,
        scheduler: Arc::new(IosMainScheduler),
    }
}

// ── Objective-C helpers ───────────────────────────────────────────────────────

#[repr(C)]
#[derive(Clone, Copy)]
struct CGPoint {
    x: f64,
    y: f64,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CGSize {
    width: f64,
    height: f64,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CGRect {
    origin: CGPoint,
    size: CGSize,
}

unsafe impl Encode for CGRect {
    fn encode() -> Encoding {
        unsafe { Encoding::from_str("{CGRect={CGPoint=dd}{CGSize=dd}}") }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Creates a retained `NSString`; the caller must release it.
fn ns_string(value: &str) -> Option<*mut Object> {
    unsafe {
        let alloc: *mut Object = msg_send![class!(NSString), alloc];
        if alloc.is_null() {
            return None;
        }
        let string: *mut Object = msg_send![alloc,
            initWithBytes: value.as_ptr()
            length: value.len()
            encoding: UTF8_ENCODING
        ];
        (!string.is_null()).then_some(string)
    }
}

/// Reads `localizedDescription` from an `NSError`.
fn error_description(error: *mut Object) -> String {
    if error.is_null() {
        return "unknown error".to_string();
    }
    unsafe {
        let description: *mut Object = msg_send![error, localizedDescription];
        if description.is_null() {
            return "unknown error".to_string();
        }
        let utf8: *const c_char = msg_send![description, UTF8String];
        if utf8.is_null() {
            return "unknown error".to_string();
        }
        CStr::from_ptr(utf8).to_string_lossy().into_owned()
    }
}

fn shared_session() -> Result<*mut Object, SessionError> {
    let session: *mut Object = unsafe { msg_send![class!(AVAudioSession), sharedInstance] };
    if session.is_null() {
        Err(SessionError::Unavailable(
            "AVAudioSession sharedInstance is null".to_string(),
        ))
    } else {
        Ok(session)
    }
}

fn is_main_thread() -> bool {
    let is_main: BOOL = unsafe { msg_send![class!(NSThread), isMainThread] };
    is_main == YES
}

/// Runs `task` now when on the main thread, otherwise on the main queue.
fn on_main(task: MainTask) {
    if is_main_thread() {
        task();
    } else {
        IosMainScheduler.schedule(task);
    }
}

// ── Audio session ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct Poller {
    observers: Vec<(ObserverToken, VolumeHandler)>,
    /// Bumped whenever polling starts or stops.
    generation: u64,
    polling: bool,
}

impl Poller {
    /// Adds an observer.  Returns the generation of a poller thread to spawn
    /// when none is running.
    fn register(&mut self, token: ObserverToken, handler: VolumeHandler) -> Option<u64> {
        self.observers.push((token, handler));
        if self.polling {
            return None;
        }
        self.polling = true;
        self.generation += 1;
        Some(self.generation)
    }

    /// Removes an observer; removing the last one retires the running thread.
    fn unregister(&mut self, token: ObserverToken) {
        self.observers.retain(|(t, _)| *t != token);
        if self.observers.is_empty() && self.polling {
            self.polling = false;
            self.generation += 1;
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Handlers to notify, or `None` when `generation` is stale.
    fn handlers(&self, generation: u64) -> Option<Vec<VolumeHandler>> {
        self.is_current(generation)
            .then(|| self.observers.iter().map(|(_, h)| h.clone()).collect())
    }
}

/// `AVAudioSession` adapter with a polling volume observer.
pub struct IosAudioSession {
    poller: Arc<Mutex<Poller>>,
}

impl IosAudioSession {
    pub fn new() -> Self {
        Self {
            poller: Arc::new(Mutex::new(Poller::default())),
        }
    }

    fn read_volume() -> f32 {
        match shared_session() {
            Ok(session) => unsafe { msg_send![session, outputVolume] },
            Err(_) => 0.0,
        }
    }

    fn spawn_poller(&self, generation: u64, initial: f32) {
        let poller = Arc::clone(&self.poller);
        thread::spawn(move || {
            debug!(generation, volume = initial, "volume poller started");
            let mut last = initial;
            loop {
                thread::sleep(POLL_INTERVAL);
                if !lock(&poller).is_current(generation) {
                    break;
                }
                let current = Self::read_volume();
                if current == last {
                    continue;
                }
                let change = VolumeChange::new(last, current);
                last = current;

                let poller = Arc::clone(&poller);
                IosMainScheduler.schedule(Box::new(move || {
                    let Some(handlers) = lock(&poller).handlers(generation) else {
                        return;
                    };
                    for handler in handlers {
                        handler(change);
                    }
                }));
            }
            debug!(generation, "volume poller stopped");
        });
    }
}

impl Default for IosAudioSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSession for IosAudioSession {
    fn set_playback_mixable_category(&self) -> Result<(), SessionError> {
        let session = shared_session()?;
        let category = ns_string("AVAudioSessionCategoryPlayback")
            .ok_or_else(|| SessionError::Category("failed to allocate category string".into()))?;
        let mut error: *mut Object = ptr::null_mut();
        let ok: BOOL = unsafe {
            let ok: BOOL = msg_send![session,
                setCategory: category
                withOptions: MIX_WITH_OTHERS
                error: &mut error as *mut *mut Object
            ];
            let _: () = msg_send![category, release];
            ok
        };
        if ok == NO {
            return Err(SessionError::Category(error_description(error)));
        }
        Ok(())
    }

    fn set_active(&self, active: bool) -> Result<(), SessionError> {
        let session = shared_session()?;
        let flag: BOOL = if active { YES } else { NO };
        let mut error: *mut Object = ptr::null_mut();
        let ok: BOOL = unsafe {
            msg_send![session, setActive: flag error: &mut error as *mut *mut Object]
        };
        if ok == NO {
            return Err(SessionError::Activation(error_description(error)));
        }
        Ok(())
    }

    fn output_volume(&self) -> f32 {
        Self::read_volume()
    }

    fn observe_output_volume(&self, handler: VolumeHandler) -> ObserverToken {
        let token = Uuid::new_v4();
        let volume = Self::read_volume();
        let spawn = lock(&self.poller).register(token, handler.clone());
        handler(VolumeChange::seed(volume));
        if let Some(generation) = spawn {
            self.spawn_poller(generation, volume);
        }
        token
    }

    fn remove_volume_observer(&self, token: ObserverToken) {
        lock(&self.poller).unregister(token);
    }
}

// ── Volume surface ────────────────────────────────────────────────────────────

/// An off-screen `MPVolumeView` used to write the volume and to keep the
/// system HUD from appearing.
///
/// Every method runs its UIKit work on the main thread.
pub struct IosVolumeSurface {
    /// `MPVolumeView *`, or 0 when detached.
    view: Arc<Mutex<usize>>,
}

impl IosVolumeSurface {
    pub fn new() -> Self {
        Self {
            view: Arc::new(Mutex::new(0)),
        }
    }

    fn with_view(&self, task: impl FnOnce(&Mutex<usize>) + Send + 'static) {
        let view = Arc::clone(&self.view);
        on_main(Box::new(move || task(&view)));
    }

    /// Finds the `UISlider` inside the volume view.
    fn slider(view: *mut Object) -> Option<*mut Object> {
        unsafe {
            let slider_class: &Class = class!(UISlider);
            let subviews: *mut Object = msg_send![view, subviews];
            if subviews.is_null() {
                return None;
            }
            let count: usize = msg_send![subviews, count];
            (0..count).find_map(|i| {
                let subview: *mut Object = msg_send![subviews, objectAtIndex: i];
                let is_slider: BOOL = msg_send![subview, isKindOfClass: slider_class];
                (is_slider == YES).then_some(subview)
            })
        }
    }

    fn attach_view(slot: &Mutex<usize>) {
        let mut slot = lock(slot);
        if *slot != 0 {
            return;
        }
        unsafe {
            let frame = CGRect {
                origin: CGPoint {
                    x: -1000.0,
                    y: -1000.0,
                },
                size: CGSize {
                    width: 1.0,
                    height: 1.0,
                },
            };
            let alloc: *mut Object = msg_send![class!(MPVolumeView), alloc];
            let view: *mut Object = msg_send![alloc, initWithFrame: frame];
            if view.is_null() {
                warn!("failed to create MPVolumeView");
                return;
            }

            let app: *mut Object = msg_send![class!(UIApplication), sharedApplication];
            let window: *mut Object = if app.is_null() {
                ptr::null_mut()
            } else {
                msg_send![app, keyWindow]
            };
            if window.is_null() {
                warn!("no key window; volume view is not in the hierarchy");
            } else {
                let _: () = msg_send![window, addSubview: view];
            }
            *slot = view as usize;
        }
    }

    fn detach_view(slot: &Mutex<usize>) {
        let view = std::mem::take(&mut *lock(slot));
        if view == 0 {
            return;
        }
        unsafe {
            let view = view as *mut Object;
            let _: () = msg_send![view, removeFromSuperview];
            let _: () = msg_send![view, release];
        }
    }

    fn hide_view(slot: &Mutex<usize>, hidden: bool) {
        let view = *lock(slot);
        if view == 0 {
            return;
        }
        let flag: BOOL = if hidden { YES } else { NO };
        unsafe {
            let _: () = msg_send![view as *mut Object, setHidden: flag];
        }
    }

    fn write_slider(slot: &Mutex<usize>, volume: f32) {
        let view = *lock(slot);
        let slider = (view != 0)
            .then_some(view as *mut Object)
            .and_then(Self::slider);
        let Some(slider) = slider else {
            warn!(volume, "volume slider unavailable, write dropped");
            return;
        };
        unsafe {
            let _: () = msg_send![slider, setValue: volume animated: NO];
            let _: () = msg_send![slider, sendActionsForControlEvents: CONTROL_EVENT_VALUE_CHANGED];
        }
    }
}

impl Default for IosVolumeSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeSurface for IosVolumeSurface {
    fn attach(&self) {
        self.with_view(Self::attach_view);
    }

    fn detach(&self) {
        self.with_view(Self::detach_view);
    }

    fn set_hidden(&self, hidden: bool) {
        self.with_view(move |slot| Self::hide_view(slot, hidden));
    }

    fn set_volume(&self, volume: f32) {
        self.with_view(move |slot| Self::write_slider(slot, volume));
    }
}

// ── Main queue scheduler ──────────────────────────────────────────────────────

#[allow(non_upper_case_globals)]
extern "C" {
    static _dispatch_main_q: c_void;
    fn dispatch_time(when: u64, delta: i64) -> u64;
    fn dispatch_after_f(
        when: u64,
        queue: *const c_void,
        context: *mut c_void,
        work: extern "C" fn(*mut c_void),
    );
}

/// `DISPATCH_TIME_NOW`.
const DISPATCH_TIME_NOW: u64 = 0;

extern "C" fn run_boxed_task(context: *mut c_void) {
    // SAFETY: `context` was produced by `Box::into_raw` in `schedule_after`
    // and libdispatch calls this trampoline exactly once.
    let task = unsafe { Box::from_raw(context as *mut MainTask) };
    task();
}

/// Schedules tasks on the main dispatch queue.
pub struct IosMainScheduler;

impl MainThreadScheduler for IosMainScheduler {
    fn schedule_after(&self, delay: Duration, task: MainTask) {
        let nanos = i64::try_from(delay.as_nanos()).unwrap_or(i64::MAX);
        let context = Box::into_raw(Box::new(task)) as *mut c_void;
        unsafe {
            let when = dispatch_time(DISPATCH_TIME_NOW, nanos);
            let queue = &_dispatch_main_q as *const c_void;
            dispatch_after_f(when, queue, context, run_boxed_task);
        }
    }
}
