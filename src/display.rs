//! Display handle passed to every board.
//!
//! Pixel addressing belongs to the hardware driver; boards here only push
//! text frames and brightness changes through the [`Display`] trait.

use colored::*;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

/// What boards can do with the panel.
pub trait Display: Send + Sync {
    /// Panel width in pixels.
    fn width(&self) -> u32;

    /// Panel height in pixels.
    fn height(&self) -> u32;

    /// Show a text frame for `board`.
    fn draw_text(&self, board: &str, lines: &[String]);

    /// Blank the panel.
    fn clear(&self);

    /// Brightness, 0-100.
    fn brightness(&self) -> u8;

    /// Set brightness, clamped to 0-100.
    fn set_brightness(&self, value: u8);
}

/// Terminal stand-in for the LED matrix.
///
/// Identical consecutive frames are not reprinted.
#[derive(Debug)]
pub struct ConsoleDisplay {
    width: u32,
    height: u32,
    brightness: AtomicU8,
    last_frame: Mutex<Option<String>>,
}

impl ConsoleDisplay {
    pub fn new(width: u32, height: u32, brightness: u8) -> Self {
        Self {
            width,
            height,
            brightness: AtomicU8::new(brightness.min(100)),
            last_frame: Mutex::new(None),
        }
    }

    fn render_frame(&self, board: &str, lines: &[String]) -> String {
        let inner = lines
            .iter()
            .map(|line| line.chars().count())
            .chain(std::iter::once(board.chars().count()))
            .max()
            .unwrap_or(0);
        let border = "-".repeat(inner + 2);
        let mut frame = format!("+{}+\n| {:<inner$} |\n+{}+\n", border, board, border, inner = inner);
        for line in lines {
            frame.push_str(&format!("| {:<inner$} |\n", line, inner = inner));
        }
        frame.push_str(&format!("+{}+", border));
        frame
    }
}

impl Display for ConsoleDisplay {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn draw_text(&self, board: &str, lines: &[String]) {
        let frame = self.render_frame(board, lines);
        let mut last = self.last_frame.lock().unwrap_or_else(PoisonError::into_inner);
        if last.as_deref() == Some(frame.as_str()) {
            return;
        }
        if self.brightness() == 0 {
            println!("{}", frame.dimmed());
        } else {
            println!("{}", frame.bright_yellow());
        }
        *last = Some(frame);
    }

    fn clear(&self) {
        let mut last = self.last_frame.lock().unwrap_or_else(PoisonError::into_inner);
        if last.is_some() {
            println!("{}", "[display cleared]".dimmed());
            *last = None;
        }
    }

    fn brightness(&self) -> u8 {
        self.brightness.load(Ordering::Relaxed)
    }

    fn set_brightness(&self, value: u8) {
        let value = value.min(100);
        if self.brightness.swap(value, Ordering::Relaxed) != value {
            log::debug!("Display brightness set to {}", value);
        }
    }
}

/// Display that records frames in memory, for tests and headless runs.
#[derive(Debug, Default)]
pub struct MemoryDisplay {
    frames: Mutex<Vec<(String, Vec<String>)>>,
    brightness: AtomicU8,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
            brightness: AtomicU8::new(100),
        }
    }

    /// Board ids in the order they drew.
    pub fn boards(&self) -> Vec<String> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(board, _)| board.clone())
            .collect()
    }

    /// Most recent frame.
    pub fn last_frame(&self) -> Option<(String, Vec<String>)> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }
}

impl Display for MemoryDisplay {
    fn width(&self) -> u32 {
        64
    }

    fn height(&self) -> u32 {
        32
    }

    fn draw_text(&self, board: &str, lines: &[String]) {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((board.to_string(), lines.to_vec()));
    }

    fn clear(&self) {}

    fn brightness(&self) -> u8 {
        self.brightness.load(Ordering::Relaxed)
    }

    fn set_brightness(&self, value: u8) {
        self.brightness.store(value.min(100), Ordering::Relaxed);
    }
}
