use crate::app::{App, Tooltip, LEGEND_WIDTH};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};
use rgb::RGB8;
use tui_choropleth::braille::BrailleCanvas;
use tui_choropleth::map::NO_DATA_COLOR;
use tui_choropleth::palette;

/// Tooltip colors (white on steel blue)
const TOOLTIP_BG: Color = Color::Rgb(70, 130, 180);
const TOOLTIP_FG: Color = Color::White;

#[inline]
fn rgb(c: RGB8) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Controls, map + legend, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Controls
            Constraint::Min(3),    // Map and legend
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(LEGEND_WIDTH)])
        .split(chunks[1]);

    render_controls(frame, app, chunks[0]);
    render_map(frame, app, body[0]);
    render_legend(frame, app, body[1]);
    render_status_bar(frame, app, chunks[2]);

    if app.controls.show_palettes {
        render_palette_preview(frame, app, area);
    }
}

fn render_controls(frame: &mut Frame, app: &App, area: Rect) {
    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::Yellow);
    let settings = &app.map_renderer.settings;

    let mut spans = vec![
        Span::styled(" Data ", label),
        Span::styled(app.dataset().name.clone(), value),
        Span::styled("  Attribute ", label),
        Span::styled(app.controls.attribute.clone().unwrap_or_else(|| "-".into()), value),
        Span::styled("  Palette ", label),
        Span::styled(app.palette_name(), value),
        Span::styled("  Colors ", label),
        Span::styled(app.controls.n_colors.to_string(), value),
        Span::styled("  3D ", label),
        Span::styled(
            if settings.show_3d { "on" } else { "off" },
            Style::default().fg(if settings.show_3d { Color::Green } else { Color::DarkGray }),
        ),
    ];
    if settings.show_3d {
        spans.push(Span::styled("  Elevation ", label));
        spans.push(Span::styled(settings.elevation_scale.to_string(), value));
        spans.push(Span::styled("  (drag to pan)", label));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let title = match &app.controls.attribute {
        Some(attribute) => format!(" {} · {} ", app.dataset().name, attribute),
        None => format!(" {} ", app.dataset().name),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(pass) = &app.pass else {
        let message = app.status.as_deref().unwrap_or("No data");
        frame.render_widget(
            Paragraph::new(message)
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true }),
            inner,
        );
        return;
    };

    // Update viewport size for rendering
    let mut viewport = app.viewport.clone();
    // Braille gives 2x4 resolution per character
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let canvas = app
        .map_renderer
        .render(pass, inner.width as usize, inner.height as usize, &viewport);

    // Get mouse cursor position for marker
    let cursor_pos = app.mouse_pixel_pos().and_then(|(px, py)| {
        // Convert braille pixels to character position
        let cx = (px / 2) as u16;
        let cy = (py / 4) as u16;
        if cx < inner.width && cy < inner.height {
            Some((cx, cy))
        } else {
            None
        }
    });

    frame.render_widget(MapWidget { canvas, cursor_pos }, inner);

    if let (Some((cx, cy)), Some(tooltip)) = (cursor_pos, app.tooltip()) {
        render_tooltip(frame, &tooltip, inner, cx, cy);
    }
}

/// Custom widget that renders a colored braille canvas
struct MapWidget {
    canvas: BrailleCanvas,
    cursor_pos: Option<(u16, u16)>,
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rows = (area.height as usize).min(self.canvas.height());
        let cols = (area.width as usize).min(self.canvas.width());

        for row in 0..rows {
            for col in 0..cols {
                // Skip empty braille characters
                let Some((ch, color)) = self.canvas.cell_at(col, row) else { continue };
                let x = area.x + col as u16;
                let y = area.y + row as u16;
                buf[(x, y)]
                    .set_char(ch)
                    .set_fg(color.map_or(Color::Gray, rgb));
            }
        }

        // Render cursor marker
        if let Some((cx, cy)) = self.cursor_pos {
            let x = area.x + cx;
            let y = area.y + cy;
            if x < area.x + area.width && y < area.y + area.height {
                buf[(x, y)].set_char('╋').set_fg(Color::Red);
            }
        }
    }
}

fn render_tooltip(frame: &mut Frame, tooltip: &Tooltip, map: Rect, cx: u16, cy: u16) {
    let value = match tooltip.value {
        Some(v) => format_value(v),
        None => "no data".to_string(),
    };
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Name: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(tooltip.attribute.clone()),
        ]),
        Line::from(vec![
            Span::styled("Value: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(value),
        ]),
    ];
    if let Some(bucket) = tooltip.bucket {
        lines.push(Line::from(format!("Bucket: {}", bucket + 1)));
    }

    let width = lines.iter().map(Line::width).max().unwrap_or(0) as u16 + 2;
    let height = lines.len() as u16;

    // Prefer below-right of the cursor, flip when near the edges
    let mut x = map.x + cx + 2;
    if x + width > map.x + map.width {
        x = (map.x + cx).saturating_sub(width + 1).max(map.x);
    }
    let mut y = map.y + cy + 1;
    if y + height > map.y + map.height {
        y = (map.y + cy).saturating_sub(height).max(map.y);
    }
    let rect = Rect::new(x, y, width.min(map.width), height.min(map.height));

    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(lines).style(Style::default().bg(TOOLTIP_BG).fg(TOOLTIP_FG)),
        rect,
    );
}

/// Vertical color strip: highest bucket at the top, no-data swatch last
fn render_legend(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(" Legend ", Style::default().fg(Color::Cyan)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(pass) = &app.pass else { return };

    let mut lines = vec![
        Line::from(Span::styled(
            app.legend_title(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    let label = Style::default().fg(Color::Gray);
    if let Some((_, hi)) = pass.value_range {
        lines.push(Line::from(Span::styled(format!("max {}", format_value(hi)), label)));
    }

    let ranges = pass.bucket_ranges();
    let counts = pass.bucket_counts();
    for (bucket, color) in pass.palette.iter().enumerate().rev() {
        let text = match ranges[bucket] {
            Some((lo, _)) => format!(" ≥{} ({})", format_value(lo), counts[bucket]),
            None => " (empty)".to_string(),
        };
        lines.push(Line::from(vec![
            Span::styled("███", Style::default().fg(rgb(*color))),
            Span::styled(text, label),
        ]));
    }

    if let Some((lo, _)) = pass.value_range {
        lines.push(Line::from(Span::styled(format!("min {}", format_value(lo)), label)));
    }

    if !pass.missing.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("███", Style::default().fg(rgb(NO_DATA_COLOR))),
            Span::styled(format!(" no data ({})", pass.missing.len()), label),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Every palette as a strip of its maximum number of colors
fn render_palette_preview(frame: &mut Frame, app: &App, area: Rect) {
    let strip_len = crate::app::MAX_COLORS;
    let name_width = app.palettes.iter().map(|p| p.len()).max().unwrap_or(0);

    let lines: Vec<Line> = app
        .palettes
        .iter()
        .map(|&name| {
            let mut spans = vec![Span::styled(
                format!("{:<width$} ", name, width = name_width),
                if name == app.palette_name() {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                },
            )];
            // Every listed palette resolves, so an error only drops its strip
            if let Ok(colors) = palette::get_rgb_palette(name, strip_len) {
                spans.extend(colors.into_iter().map(|c| Span::styled("█", Style::default().fg(rgb(c)))));
            }
            Line::from(spans)
        })
        .collect();

    let width = (name_width + strip_len + 3) as u16;
    let height = lines.len() as u16 + 2;
    let popup = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width.min(area.width),
        height.min(area.height),
    );

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(" Color palettes ", Style::default().fg(Color::Cyan))),
        ),
        popup,
    );
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
        Span::styled(" Zoom: ", dim),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", dim),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
    ];
    match &app.status {
        Some(message) if app.pass.is_some() => {
            spans.push(Span::styled(" | ", dim));
            spans.push(Span::styled(message.clone(), Style::default().fg(Color::Red)));
        }
        _ => spans.push(Span::styled(
            " | d:data a:attr c:palette [/]:colors 3:3D </>:elev o:outline n:nodata p:palettes r:reset R:reload q:quit",
            dim,
        )),
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Compact number formatting for legend and tooltip
fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else if v.abs() >= 100.0 {
        format!("{:.1}", v)
    } else {
        format!("{:.3}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(1200.0), "1200");
        assert_eq!(format_value(1234.56), "1234.6");
        assert_eq!(format_value(0.12345), "0.123");
    }
}
