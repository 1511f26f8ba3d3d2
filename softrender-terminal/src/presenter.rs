/// Presents a color buffer in the terminal
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use image::{Rgb, RgbImage};
use std::io::Write;

/// Upper half block: foreground paints the top pixel, background the bottom one.
const HALF_BLOCK: char = '▀';

/// Draws an RGB image two pixel rows per terminal row.
pub struct TerminalPresenter {
    /// First terminal row used for the image.
    top: u16,
}

impl TerminalPresenter {
    pub fn new(top: u16) -> Self {
        Self { top }
    }

    /// Terminal rows needed for an image of `height` pixels.
    pub fn rows_for(height: u32) -> u32 {
        height.div_ceil(2)
    }

    /// Pixel rows that fit in `rows` terminal rows below the presenter's top.
    pub fn pixel_rows(&self, rows: u16) -> u32 {
        u32::from(rows.saturating_sub(self.top)) * 2
    }

    /// Queue the whole image; the caller flushes.
    pub fn draw<W: Write>(&self, image: &RgbImage, writer: &mut W) -> std::io::Result<()> {
        let (width, height) = image.dimensions();
        let mut last: Option<(Rgb<u8>, Rgb<u8>)> = None;
        for row in 0..Self::rows_for(height) {
            writer.queue(cursor::MoveTo(0, self.top + row as u16))?;
            let y = row * 2;
            for x in 0..width {
                let upper = *image.get_pixel(x, y);
                let lower = if y + 1 < height {
                    *image.get_pixel(x, y + 1)
                } else {
                    Rgb([0, 0, 0])
                };
                if last != Some((upper, lower)) {
                    writer.queue(SetForegroundColor(to_color(upper)))?;
                    writer.queue(SetBackgroundColor(to_color(lower)))?;
                    last = Some((upper, lower));
                }
                writer.queue(Print(HALF_BLOCK))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

fn to_color(Rgb([r, g, b]): Rgb<u8>) -> Color {
    Color::Rgb { r, g, b }
}
