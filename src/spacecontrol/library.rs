//! SpaceControl client library session
//!
//! This module loads `libspc_ctrl.so` at runtime and drives the daemon through
//! its C interface (`scConnect2`, `scGetDevNum`, `scFetchStdData`,
//! `scDisconnect`). Fetched samples are turned into [`RawEvent`]s by a
//! [`SampleTracker`], which only reports what changed between samples.
//! All changes from one sample are delivered together.

use crate::spacecontrol::constants::*;
use crate::spacecontrol::session::{ConnectionError, DaemonHandle, DaemonSession, NextEvent};
use crate::spacecontrol::types::{HighLevelEvent, RawEvent, StdSample, AXIS_COUNT};
use libloading::{Library, Symbol};
use log::{debug, error, info, trace, warn};
use std::os::raw::{c_char, c_int, c_long, c_short};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

type ScConnect2Fn = unsafe extern "C" fn(bool, *const c_char) -> c_int;
type ScDisconnectFn = unsafe extern "C" fn() -> c_int;
type ScGetDevNumFn = unsafe extern "C" fn(*mut c_int, *mut c_int, *mut c_int) -> c_int;
type ScFetchStdDataFn = unsafe extern "C" fn(
    c_int,
    *mut c_short,
    *mut c_short,
    *mut c_short,
    *mut c_short,
    *mut c_short,
    *mut c_short,
    *mut c_int,
    *mut c_int,
    *mut c_int,
    *mut c_long,
    *mut c_long,
) -> c_int;

/// Resolved entry points; the function pointers stay valid while `_library` lives
struct ScApi {
    connect2: ScConnect2Fn,
    disconnect: ScDisconnectFn,
    get_dev_num: ScGetDevNumFn,
    fetch_std_data: ScFetchStdDataFn,
    _library: Library,
}

impl ScApi {
    fn load(path: &Path) -> Result<Self, ConnectionError> {
        let library = unsafe {
            Library::new(path).map_err(|e| ConnectionError::LibraryLoad(e.to_string()))?
        };

        let (connect2, disconnect, get_dev_num, fetch_std_data) = unsafe {
            let connect2: Symbol<'_, ScConnect2Fn> = library
                .get(b"scConnect2")
                .map_err(|e| ConnectionError::LibraryLoad(format!("Missing scConnect2: {}", e)))?;
            let disconnect: Symbol<'_, ScDisconnectFn> = library
                .get(b"scDisconnect")
                .map_err(|e| ConnectionError::LibraryLoad(format!("Missing scDisconnect: {}", e)))?;
            let get_dev_num: Symbol<'_, ScGetDevNumFn> = library
                .get(b"scGetDevNum")
                .map_err(|e| ConnectionError::LibraryLoad(format!("Missing scGetDevNum: {}", e)))?;
            let fetch_std_data: Symbol<'_, ScFetchStdDataFn> =
                library.get(b"scFetchStdData").map_err(|e| {
                    ConnectionError::LibraryLoad(format!("Missing scFetchStdData: {}", e))
                })?;
            (*connect2, *disconnect, *get_dev_num, *fetch_std_data)
        };

        Ok(Self {
            connect2,
            disconnect,
            get_dev_num,
            fetch_std_data,
            _library: library,
        })
    }
}

/// Device counts reported by `scGetDevNum`
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceCount {
    pub devices: i32,
    pub used: i32,
    pub max_index: i32,
}

/// Converts consecutive samples into change events
///
/// Motion is reported when any axis differs from the previous sample. The
/// `event` field is reported when it changes: values in `(0, 0x20000)` are
/// button masks, values at or above `0x20000` are high-level events (held
/// until the field changes again), anything else releases all buttons.
#[derive(Debug, Default)]
pub struct SampleTracker {
    last_axes: [i16; AXIS_COUNT],
    last_event: i32,
    last_mask: u32,
    active_high_level: Option<u32>,
}

impl SampleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events describing what changed since the previous sample
    pub fn track(&mut self, sample: &StdSample) -> Vec<RawEvent> {
        let mut events = Vec::new();

        if sample.axes != self.last_axes {
            let axes = sample.axes.iter().map(|&v| v as i32).collect();
            events.push(RawEvent::Motion { axes });
            self.last_axes = sample.axes;
        }

        if sample.event != self.last_event {
            self.track_event_field(sample.event, &mut events);
            self.last_event = sample.event;
        }

        events
    }

    fn track_event_field(&mut self, value: i32, events: &mut Vec<RawEvent>) {
        if value >= HIGH_LEVEL_EVENT_THRESHOLD {
            // High-level events replace any held low-level buttons
            self.set_mask(0, events);
            self.release_high_level(events);
            let id = value as u32;
            events.push(RawEvent::high_level(HighLevelEvent::pressed(id)));
            self.active_high_level = Some(id);
            return;
        }

        self.release_high_level(events);
        let mask = if value > 0 { value as u32 } else { 0 };
        self.set_mask(mask, events);
    }

    fn set_mask(&mut self, mask: u32, events: &mut Vec<RawEvent>) {
        if mask != self.last_mask {
            events.push(RawEvent::buttons(mask));
            self.last_mask = mask;
        }
    }

    fn release_high_level(&mut self, events: &mut Vec<RawEvent>) {
        if let Some(id) = self.active_high_level.take() {
            events.push(RawEvent::high_level(HighLevelEvent::released(id)));
        }
    }
}

/// Daemon session backed by the vendor client library
pub struct SpaceControlLibrary {
    path: PathBuf,
    api: Option<ScApi>,
    active: Option<DaemonHandle>,
    device_count: DeviceCount,
    tracker: SampleTracker,
}

impl SpaceControlLibrary {
    /// Create a session for the library at `path`. Nothing is loaded until `connect`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            api: None,
            active: None,
            device_count: DeviceCount::default(),
            tracker: SampleTracker::new(),
        }
    }

    /// Session for the library at its default install location
    pub fn with_default_path() -> Self {
        Self::new(DEFAULT_LIBRARY_PATH)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Device counts from the last successful connect
    pub fn device_count(&self) -> DeviceCount {
        self.device_count
    }

    fn api(&mut self) -> Result<&ScApi, ConnectionError> {
        if self.api.is_none() {
            if !self.path.exists() {
                return Err(ConnectionError::LibraryNotFound(self.path.clone()));
            }
            let api = ScApi::load(&self.path)?;
            info!("Successfully loaded library: {}", self.path.display());
            self.api = Some(api);
        }
        self.api
            .as_ref()
            .ok_or_else(|| ConnectionError::LibraryLoad("library not loaded".into()))
    }

    fn query_devices(api: &ScApi) -> Result<DeviceCount, ScStatus> {
        let mut devices: c_int = 0;
        let mut used: c_int = 0;
        let mut max_index: c_int = 0;

        let status = unsafe { (api.get_dev_num)(&mut devices, &mut used, &mut max_index) };
        if status != 0 {
            return Err(ScStatus::from_code(status));
        }

        Ok(DeviceCount { devices, used, max_index })
    }

    /// Fetch one sample. `Ok(None)` means the daemon had nothing new.
    fn fetch(&self) -> Result<Option<StdSample>, ScStatus> {
        let api = match self.api.as_ref() {
            Some(api) => api,
            None => return Err(ScStatus::CommunicationError),
        };

        let mut axes: [c_short; AXIS_COUNT] = [0; AXIS_COUNT];
        let mut tra_lmh: c_int = 0;
        let mut rot_lmh: c_int = 0;
        let mut event: c_int = 0;
        let mut tv_sec: c_long = 0;
        let mut tv_usec: c_long = 0;

        let status = unsafe {
            let [x, y, z, a, b, c] = &mut axes;
            (api.fetch_std_data)(
                DEVICE_INDEX,
                x,
                y,
                z,
                a,
                b,
                c,
                &mut tra_lmh,
                &mut rot_lmh,
                &mut event,
                &mut tv_sec,
                &mut tv_usec,
            )
        };

        match status {
            0 => {
                let sample = StdSample {
                    axes,
                    tra_lmh,
                    rot_lmh,
                    event,
                    tv_sec: tv_sec as i64,
                    tv_usec: tv_usec as i64,
                };
                trace!("Fetched sample: {:?} ({})", sample, describe_event(event));
                Ok(Some(sample))
            }
            1 | NOTHING_CHANGED => {
                trace!("No new data ({})", describe_event(status));
                Ok(None)
            }
            other => Err(ScStatus::from_code(other)),
        }
    }
}

impl DaemonSession for SpaceControlLibrary {
    fn connect(&mut self) -> Result<DaemonHandle, ConnectionError> {
        if let Some(handle) = self.active {
            warn!("Already connected to daemon ({}), reusing session", handle);
            return Ok(handle);
        }

        let api = self.api()?;

        info!(
            "Connecting using scConnect2 with anonymous application name \
             and isAlwaysReceivingData=true"
        );
        let status = unsafe { (api.connect2)(true, std::ptr::null()) };
        if status != 0 {
            return Err(ConnectionError::Refused(ScStatus::from_code(status)));
        }

        let count = match Self::query_devices(api) {
            Ok(count) => count,
            Err(status) => {
                unsafe { (api.disconnect)() };
                return Err(ConnectionError::DeviceQuery(status));
            }
        };

        info!(
            "Detected {} SpaceControl device(s). Used: {}, Max Index: {}",
            count.devices, count.used, count.max_index
        );

        if count.devices == 0 {
            unsafe { (api.disconnect)() };
            return Err(ConnectionError::NoDevices);
        }

        let handle = DaemonHandle::allocate();
        self.device_count = count;
        self.active = Some(handle);
        self.tracker = SampleTracker::new();

        info!("✓ Connected to SpaceControl daemon ({})", handle);
        Ok(handle)
    }

    fn next_event(&mut self, handle: DaemonHandle, timeout: Duration) -> NextEvent {
        if self.active != Some(handle) {
            warn!("next_event called with inactive handle {}", handle);
            return NextEvent::ConnectionLost;
        }

        let deadline = Instant::now() + timeout;

        loop {
            match self.fetch() {
                Ok(Some(sample)) => {
                    if let Some(next) = NextEvent::from_sample(self.tracker.track(&sample)) {
                        return next;
                    }
                }
                Ok(None) => {}
                Err(status) if status.is_session_fatal() => {
                    error!("scFetchStdData() reported {}, session lost", status);
                    return NextEvent::ConnectionLost;
                }
                Err(status) => {
                    error!("scFetchStdData() returned error status: {}", status);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return NextEvent::Timeout;
            }
            thread::sleep(FETCH_POLL_INTERVAL.min(deadline - now));
        }
    }

    fn disconnect(&mut self, handle: DaemonHandle) {
        if self.active != Some(handle) {
            debug!("Session {} already closed", handle);
            return;
        }

        if let Some(api) = self.api.as_ref() {
            let status = unsafe { (api.disconnect)() };
            if status != 0 {
                warn!("scDisconnect() returned {}", ScStatus::from_code(status));
            }
        }

        self.active = None;
        info!("Disconnected from daemon ({})", handle);
    }
}
