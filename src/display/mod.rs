//! Frame presentation.
//!
//! The monitor talks to a [`DisplaySink`]. [`WindowSink`] is the native implementation: it shows
//! frames in a window and stops being active once the user closes that window.
//!
//! Windowing has to happen on the main thread, so [`run`] takes over the main thread with the
//! event loop and runs the application on a second thread.

mod renderer;

use std::{
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    process,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, OnceLock,
    },
};

use anyhow::anyhow;
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy},
    window::WindowId,
};

use crate::image::{Image, Resolution};

use self::renderer::{Gpu, Renderer, Window};

/// Where annotated frames are presented.
pub trait DisplaySink {
    /// Returns whether the sink is still presenting. The monitor stops once this is `false`.
    fn is_active(&self) -> bool;

    /// Presents `frame`.
    fn render(&mut self, frame: &Image) -> anyhow::Result<()>;

    /// Sets a short status label shown alongside the frames.
    fn set_status(&mut self, status: &str);

    /// Called once the monitor stops. Returns an error if presentation ended because of a
    /// failure rather than being closed.
    fn finish(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<D: DisplaySink + ?Sized> DisplaySink for Box<D> {
    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn render(&mut self, frame: &Image) -> anyhow::Result<()> {
        (**self).render(frame)
    }

    fn set_status(&mut self, status: &str) {
        (**self).set_status(status)
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        (**self).finish()
    }
}

#[derive(Debug)]
enum Msg {
    Image {
        key: String,
        res: Resolution,
        data: Vec<u8>,
    },
    Status {
        key: String,
        status: String,
    },
}

/// Open/failed state shared by the event loop and the sinks.
struct DisplayState {
    open: AtomicBool,
    error: Mutex<Option<String>>,
}

impl DisplayState {
    fn new() -> Self {
        Self {
            open: AtomicBool::new(true),
            error: Mutex::new(None),
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            log::debug!("display closed");
        }
    }

    /// Closes the display and records `error`. Only the first error is kept.
    fn fail(&self, error: String) {
        if let Ok(mut slot) = self.error.lock() {
            slot.get_or_insert(error);
        }
        self.close();
    }

    fn take_error(&self) -> Option<String> {
        self.error.lock().ok().and_then(|mut slot| slot.take())
    }
}

struct Display {
    proxy: Mutex<EventLoopProxy<Msg>>,
    state: DisplayState,
}

static DISPLAY: OnceLock<Display> = OnceLock::new();

impl Display {
    fn send(&self, msg: Msg) -> bool {
        let sent = match self.proxy.lock() {
            Ok(proxy) => proxy.send_event(msg).is_ok(),
            Err(_poisoned) => false,
        };
        if !sent {
            self.state.close();
        }
        sent
    }
}

struct Gui {
    gpu: Rc<Gpu>,
    windows: HashMap<String, Renderer>,
    win_id_to_key: HashMap<WindowId, String>,
}

impl Gui {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            gpu: Rc::new(pollster::block_on(Gpu::open())?),
            windows: HashMap::new(),
            win_id_to_key: HashMap::new(),
        })
    }

    fn run(mut self, event_loop: EventLoop<Msg>, display: &'static Display) -> ! {
        event_loop.run(move |event, target, flow| {
            *flow = ControlFlow::Wait;
            match event {
                Event::UserEvent(Msg::Image { key, res, data }) => {
                    if !display.state.is_open() {
                        return;
                    }
                    if !self.windows.contains_key(&key) {
                        log::debug!("creating window '{key}' at {res}");
                        let renderer = Window::open(target, &key, res)
                            .and_then(|win| Renderer::new(win, self.gpu.clone()));
                        match renderer {
                            Ok(renderer) => {
                                self.win_id_to_key
                                    .insert(renderer.window().id(), key.clone());
                                self.windows.insert(key.clone(), renderer);
                            }
                            Err(e) => {
                                log::error!("failed to open window '{key}': {e:#}");
                                display
                                    .state
                                    .fail(format!("failed to open window '{key}': {e:#}"));
                                return;
                            }
                        }
                    }
                    if let Some(renderer) = self.windows.get_mut(&key) {
                        renderer.update_texture(res, &data);
                        renderer.window().request_redraw();
                    }
                }
                Event::UserEvent(Msg::Status { key, status }) => {
                    if let Some(renderer) = self.windows.get(&key) {
                        renderer.window().set_title(&format!("{status} ({key})"));
                    }
                }
                Event::WindowEvent {
                    window_id,
                    event: WindowEvent::CloseRequested,
                } => {
                    if let Some(key) = self.win_id_to_key.remove(&window_id) {
                        log::info!("window '{key}' closed");
                        self.windows.remove(&key);
                    }
                    display.state.close();
                }
                Event::RedrawRequested(window_id) => {
                    if let Some(renderer) = self
                        .win_id_to_key
                        .get(&window_id)
                        .and_then(|key| self.windows.get_mut(key))
                    {
                        renderer.redraw();
                    }
                }
                _ => {}
            }
        });
    }
}

/// Runs `app` on a background thread while the main thread drives the windowing event loop.
///
/// Never returns. The process exits once `app` returns: with status 0 if it returned `Ok`, 1 if
/// it returned an error (which is logged), and 101 if it panicked.
pub fn run<F>(app: F) -> !
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
{
    let event_loop = EventLoopBuilder::with_user_event().build();
    let display = DISPLAY.get_or_init(|| Display {
        proxy: Mutex::new(event_loop.create_proxy()),
        state: DisplayState::new(),
    });

    let gui = match Gui::new() {
        Ok(gui) => gui,
        Err(e) => {
            log::error!("failed to initialize display: {e:#}");
            process::exit(1);
        }
    };

    std::thread::spawn(move || {
        let result = catch_unwind(AssertUnwindSafe(app));
        match result {
            Ok(Ok(())) => process::exit(0),
            Ok(Err(e)) => {
                log::error!("{e:?}");
                process::exit(1);
            }
            Err(_payload) => {
                // The panic hook has printed the message already; mimic libstd's exit code.
                process::exit(101);
            }
        }
    });

    gui.run(event_loop, display);
}

/// Shows frames in a native window.
///
/// The window is created when the first frame is rendered. Requires the event loop started by
/// [`run`].
pub struct WindowSink {
    key: String,
    display: &'static Display,
}

impl WindowSink {
    /// Creates a sink for the window titled `key`.
    pub fn new(key: impl Into<String>) -> anyhow::Result<Self> {
        let display = DISPLAY
            .get()
            .ok_or_else(|| anyhow!("display not initialized; use `display::run`"))?;
        Ok(Self {
            key: key.into(),
            display,
        })
    }
}

impl DisplaySink for WindowSink {
    fn is_active(&self) -> bool {
        self.display.state.is_open()
    }

    fn render(&mut self, frame: &Image) -> anyhow::Result<()> {
        // A closed event loop only marks the sink inactive; the monitor stops at its next check.
        self.display.send(Msg::Image {
            key: self.key.clone(),
            res: frame.resolution(),
            data: frame.data().to_vec(),
        });
        Ok(())
    }

    fn set_status(&mut self, status: &str) {
        self.display.send(Msg::Status {
            key: self.key.clone(),
            status: status.to_string(),
        });
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        match self.display.state.take_error() {
            Some(error) => Err(anyhow!(error)),
            None => Ok(()),
        }
    }
}
