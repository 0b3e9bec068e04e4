/// Card face layout: turns contact fields and a theme into paint commands

use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::rendering::paint::{Color, ImageOrigin, PaintCommand};
use crate::Size;

/// Contact fields shown on the card
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardContent {
    pub name: String,
    pub title: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// Name block on the left, contact lines on the right
    #[default]
    Split,
    /// Everything stacked and centered
    Centered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardTheme {
    pub primary: Color,
    pub secondary: Color,
    pub accent: Color,
    pub text: Color,
    pub layout: LayoutKind,
    pub name_size: u32,
    pub title_size: u32,
    pub body_size: u32,
}

impl Default for CardTheme {
    fn default() -> Self {
        // "Executive Classic"
        Self {
            primary: Color::rgb(0x1e, 0x3a, 0x8a),
            secondary: Color::rgb(0xf8, 0xfa, 0xfc),
            accent: Color::rgb(0x3b, 0x82, 0xf6),
            text: Color::rgb(0x1e, 0x29, 0x3b),
            layout: LayoutKind::Split,
            name_size: 18,
            title_size: 12,
            body_size: 10,
        }
    }
}

/// A logo drawn in the badge slot
#[derive(Debug, Clone)]
pub struct Logo {
    pub pixels: Arc<RgbaImage>,
    pub origin: ImageOrigin,
}

/// Preview size of a card face in CSS pixels (3.5in x 2in at 100px per inch)
pub const CARD_SIZE: Size = Size { width: 350, height: 200 };

const PADDING: i32 = 24;
const BADGE: u32 = 56;

/// Initials shown in the badge when no logo is given, "YN" for an empty name.
pub fn initials(name: &str) -> String {
    let s: String = name
        .split_whitespace()
        .filter_map(|w| w.chars().next())
        .flat_map(|c| c.to_uppercase())
        .collect();
    if s.is_empty() {
        "YN".to_string()
    } else {
        s
    }
}

fn text(x: i32, y: i32, s: &str, size: u32, color: Color) -> PaintCommand {
    PaintCommand::Text {
        x,
        y,
        text: s.to_string(),
        size,
        color,
    }
}

/// Approximate rendered width of `s` at glyph size `size`
fn text_width(s: &str, size: u32) -> i32 {
    (s.chars().count() as f32 * size as f32 * 0.6).round() as i32
}

/// Contact lines in display order, skipping empty fields.
fn contact_lines(content: &CardContent) -> Vec<String> {
    let website = content
        .website
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    [
        content.company.as_str(),
        content.email.as_str(),
        content.phone.as_str(),
        website,
        content.address.as_str(),
    ]
    .iter()
    .filter(|s| !s.trim().is_empty())
    .map(|s| s.trim().to_string())
    .collect()
}

/// Lay out a card face of `size` CSS pixels.
pub fn layout_card(
    content: &CardContent,
    theme: &CardTheme,
    logo: Option<&Logo>,
    size: Size,
) -> Vec<PaintCommand> {
    let mut cmds = vec![PaintCommand::SolidRect {
        x: 0,
        y: 0,
        width: size.width,
        height: size.height,
        color: theme.secondary,
    }];

    let name = if content.name.trim().is_empty() { "Your Name" } else { content.name.trim() };
    let title = if content.title.trim().is_empty() { "Your Title" } else { content.title.trim() };
    let lines = contact_lines(content);
    let line_h = theme.body_size as i32 + 6;
    let width = size.width as i32;
    let height = size.height as i32;

    match theme.layout {
        LayoutKind::Split => {
            push_badge(&mut cmds, content, theme, logo, PADDING, PADDING);

            let title_y = height - PADDING - theme.title_size as i32;
            let name_y = title_y - 4 - theme.name_size as i32;
            cmds.push(text(PADDING, name_y, name, theme.name_size, theme.text));
            cmds.push(text(PADDING, title_y, title, theme.title_size, theme.accent));

            let block_h = lines.len() as i32 * line_h;
            let mut y = (height - block_h) / 2;
            for line in &lines {
                let x = width - PADDING - text_width(line, theme.body_size);
                cmds.push(text(x.max(width / 2), y, line, theme.body_size, theme.accent));
                y += line_h;
            }
        }
        LayoutKind::Centered => {
            let center = |s: &str, sz: u32| (width - text_width(s, sz)) / 2;
            let badge_x = (width - BADGE as i32) / 2;
            push_badge(&mut cmds, content, theme, logo, badge_x, PADDING / 2);

            let mut y = PADDING / 2 + BADGE as i32 + 8;
            cmds.push(text(center(name, theme.name_size), y, name, theme.name_size, theme.text));
            y += theme.name_size as i32 + 4;
            cmds.push(text(center(title, theme.title_size), y, title, theme.title_size, theme.accent));
            y += theme.title_size as i32 + 8;
            for line in &lines {
                if y + line_h > height {
                    break;
                }
                cmds.push(text(center(line, theme.body_size), y, line, theme.body_size, theme.text));
                y += line_h;
            }
        }
    }

    cmds
}

fn push_badge(
    cmds: &mut Vec<PaintCommand>,
    content: &CardContent,
    theme: &CardTheme,
    logo: Option<&Logo>,
    x: i32,
    y: i32,
) {
    match logo {
        Some(logo) => cmds.push(PaintCommand::Image {
            x,
            y,
            width: BADGE,
            height: BADGE,
            pixels: logo.pixels.clone(),
            origin: logo.origin,
        }),
        None => {
            cmds.push(PaintCommand::SolidRect {
                x,
                y,
                width: BADGE,
                height: BADGE,
                color: theme.primary,
            });
            let label = initials(&content.name);
            let size = 18u32;
            let tx = x + (BADGE as i32 - text_width(&label, size)) / 2;
            let ty = y + (BADGE as i32 - size as i32) / 2;
            cmds.push(text(tx, ty, &label, size, Color::WHITE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> CardContent {
        CardContent {
            name: "Jane Doe".into(),
            title: "Principal Engineer".into(),
            company: "Acme".into(),
            email: "jane@acme.test".into(),
            website: "https://acme.test".into(),
            ..Default::default()
        }
    }

    #[test]
    fn initials_fall_back_to_placeholder() {
        assert_eq!(initials("jane doe"), "JD");
        assert_eq!(initials("  "), "YN");
    }

    #[test]
    fn split_layout_places_background_name_and_contacts() {
        let cmds = layout_card(&content(), &CardTheme::default(), None, CARD_SIZE);
        assert!(matches!(cmds[0], PaintCommand::SolidRect { width: 350, height: 200, .. }));
        let texts: Vec<&str> = cmds
            .iter()
            .filter_map(|c| match c {
                PaintCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(texts.contains(&"JD"));
        assert!(texts.contains(&"Jane Doe"));
        assert!(texts.contains(&"acme.test"));
        assert!(!texts.iter().any(|t| t.starts_with("https://")));
    }

    #[test]
    fn empty_fields_are_skipped_and_placeholders_used() {
        let cmds = layout_card(&CardContent::default(), &CardTheme::default(), None, CARD_SIZE);
        let texts: Vec<&str> = cmds
            .iter()
            .filter_map(|c| match c {
                PaintCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["YN", "Your Name", "Your Title"]);
    }

    #[test]
    fn logo_replaces_initials_badge() {
        let logo = Logo {
            pixels: Arc::new(RgbaImage::new(8, 8)),
            origin: ImageOrigin::CorsEnabled,
        };
        let theme = CardTheme {
            layout: LayoutKind::Centered,
            ..Default::default()
        };
        let cmds = layout_card(&content(), &theme, Some(&logo), CARD_SIZE);
        assert!(cmds.iter().any(|c| matches!(
            c,
            PaintCommand::Image { origin: ImageOrigin::CorsEnabled, .. }
        )));
    }

    #[test]
    fn theme_deserializes_with_defaults() {
        let theme: CardTheme =
            serde_json::from_str(r##"{"primary":"#000000","layout":"centered"}"##).unwrap();
        assert_eq!(theme.primary, Color::BLACK);
        assert_eq!(theme.layout, LayoutKind::Centered);
        assert_eq!(theme.name_size, 18);
    }
}
