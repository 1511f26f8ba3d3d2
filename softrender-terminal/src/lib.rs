/// Terminal front end for the software rasterizer
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use image::{imageops, Rgb};
use nalgebra::Vector4;
use softrender_core::{FileImageSource, Mesh, RenderDevice, RenderError, RotationState, Transform};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

pub mod presenter;

pub use presenter::TerminalPresenter;

/// Terminal rows kept for the status line.
const HUD_ROWS: u16 = 1;

/// Frames each background stays up when cycling through an image source.
const FRAMES_PER_BACKGROUND: u32 = 60;

const AXIS_LENGTH: f32 = 1.5;

fn to_io(err: RenderError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, err)
}

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    mesh: Mesh,
    rotation: RotationState,
    device: RenderDevice,
    presenter: TerminalPresenter,
    backgrounds: Option<FileImageSource>,
    perspective: bool,
    show_axes: bool,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    total_frames: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(mesh: Mesh) -> io::Result<Self> {
        let (columns, rows) = terminal::size()?;
        let presenter = TerminalPresenter::new(HUD_ROWS);
        let device =
            RenderDevice::new(u32::from(columns), presenter.pixel_rows(rows)).map_err(to_io)?;

        Ok(Self {
            mesh,
            rotation: RotationState::new(0.3, 0.3, 0.0),
            device,
            presenter,
            backgrounds: None,
            perspective: true,
            show_axes: true,
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            total_frames: 0,
            fps: 0.0,
        })
    }

    /// Cycle backgrounds from `source`, scaled to the viewport.
    pub fn with_backgrounds(mut self, source: FileImageSource) -> Self {
        self.backgrounds = Some(source);
        self.next_background();
        self
    }

    pub fn device(&self) -> &RenderDevice {
        &self.device
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?)?;
            }

            self.update();
            self.render_frame();
            self.present()?;

            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> io::Result<()> {
        match event {
            Event::Key(KeyEvent { code, .. }) => self.handle_key(code).map_err(to_io),
            Event::Resize(columns, rows) => self.resize(columns, rows),
            _ => Ok(()),
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<(), RenderError> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('w') | KeyCode::Up => self.rotation.rotate(0.1, 0.0, 0.0),
            KeyCode::Char('s') | KeyCode::Down => self.rotation.rotate(-0.1, 0.0, 0.0),
            KeyCode::Char('a') | KeyCode::Left => self.rotation.rotate(0.0, -0.1, 0.0),
            KeyCode::Char('d') | KeyCode::Right => self.rotation.rotate(0.0, 0.1, 0.0),
            KeyCode::Char('e') => self.rotation.rotate(0.0, 0.0, 0.1),
            KeyCode::Char('r') => self.rotation.rotate(0.0, 0.0, -0.1),
            KeyCode::Char('p') => {
                self.device.update_projection_transform(!self.perspective)?;
                self.perspective = !self.perspective;
            }
            KeyCode::Char('x') => self.show_axes = !self.show_axes,
            KeyCode::Char('b') => self.next_background(),
            _ => {}
        }
        Ok(())
    }

    fn resize(&mut self, columns: u16, rows: u16) -> io::Result<()> {
        let height = self.presenter.pixel_rows(rows);
        if let Err(err) = self.device.set_viewport(u32::from(columns), height) {
            // Keep the old viewport until the terminal is large enough again.
            log::warn!("ignoring resize to {}x{}: {}", columns, rows, err);
            return Ok(());
        }
        if let Some(source) = self.backgrounds.as_mut() {
            source.rewind();
            self.next_background();
        }
        execute!(stdout(), terminal::Clear(ClearType::All))
    }

    /// Decode the next background, wrapping around at the end of the source.
    fn next_background(&mut self) {
        let (width, height) = (self.device.width(), self.device.height());
        let Some(source) = self.backgrounds.as_mut() else {
            return;
        };
        if source.is_empty() {
            return;
        }
        let decoded = match source.next() {
            Some(decoded) => decoded,
            None => {
                source.rewind();
                match source.next() {
                    Some(decoded) => decoded,
                    None => return,
                }
            }
        };
        match decoded {
            Ok(image) => {
                let scaled = imageops::resize(&image, width, height, imageops::FilterType::Triangle);
                if let Err(err) = self.device.set_background_image(scaled) {
                    log::warn!("background rejected: {}", err);
                }
            }
            Err(err) => log::warn!("skipping background: {}", err),
        }
    }

    fn update(&mut self) {
        // Continuous slow rotation for demo effect
        self.rotation.rotate(0.01, 0.015, 0.0);
        self.total_frames = self.total_frames.wrapping_add(1);
        if self.total_frames % FRAMES_PER_BACKGROUND == 0 {
            self.next_background();
        }
    }

    /// Rasterize one frame into the device buffers.
    pub fn render_frame(&mut self) {
        self.device
            .set_world_transform(Transform::rotation_matrix(&self.rotation));
        self.device.reset_buffers();
        self.device.render_mesh(&self.mesh);

        if self.show_axes {
            let origin = Vector4::new(0.0, 0.0, 0.0, 1.0);
            let axes = [
                (Vector4::new(AXIS_LENGTH, 0.0, 0.0, 1.0), Rgb([255, 64, 64])),
                (Vector4::new(0.0, AXIS_LENGTH, 0.0, 1.0), Rgb([64, 255, 64])),
                (Vector4::new(0.0, 0.0, AXIS_LENGTH, 1.0), Rgb([64, 64, 255])),
            ];
            for (tip, color) in axes {
                self.device.render_line(origin, tip, color);
            }
        }
    }

    fn present(&mut self) -> io::Result<()> {
        let mut stdout = stdout();
        self.presenter.draw(self.device.image(), &mut stdout)?;

        // Draw UI overlay
        let mode = if self.perspective { "persp" } else { "ortho" };
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "softrender | FPS: {:.1} | {} | WASD/Arrows=Rotate E/R=Roll P=Projection X=Axes B=Background Q=Quit",
                self.fps, mode
            )),
            ResetColor
        )?;

        stdout.flush()
    }
}
