//! Design renderer
//!
//! Converts an [`EmailDesignDocument`] into email-client-safe HTML.
//! Layout is table-based throughout; responsive CSS for column stacking
//! is accumulated in a [`RenderContext`] during the tree walk and emitted
//! once in the document head rather than duplicated per block.
//!
//! Rendering never fails: an [`Block::Unknown`] node (a block type this
//! build does not recognize) renders to nothing, favoring a degraded
//! email over a blocked campaign.

use std::fmt::Write as _;

use crate::design::{
    Alignment, Block, Column, EmailDesignDocument, GlobalSettings, Padding, Row, SocialLink,
};

/// Options supplied per render
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Public base URL; root-relative image URLs are resolved against it
    pub base_url: Option<String>,
}

/// Shared state threaded through the render walk
///
/// Accumulates responsive CSS fragments so column breakpoints appear once
/// at the document level.
#[derive(Debug, Default)]
pub struct RenderContext {
    responsive_styles: Vec<String>,
}

impl RenderContext {
    fn push_style(&mut self, css: &str) {
        if !self.responsive_styles.iter().any(|s| s == css) {
            self.responsive_styles.push(css.to_string());
        }
    }
}

/// Render a design document to a complete HTML email
#[must_use]
pub fn render(design: &EmailDesignDocument, options: &RenderOptions) -> String {
    let mut ctx = RenderContext::default();
    let settings = &design.settings;

    let mut rows_html = String::new();
    for row in &design.rows {
        rows_html.push_str(&render_row(row, settings, options, &mut ctx));
    }

    let responsive = ctx.responsive_styles.join("\n");

    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\" />\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\" />\n\
         <style>\n{responsive}\n</style>\n\
         </head>\n\
         <body style=\"margin:0;padding:0;background-color:{bg};\">\n\
         <table role=\"presentation\" width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" border=\"0\" style=\"background-color:{bg};\">\n\
         <tr><td align=\"center\">\n\
         <table role=\"presentation\" width=\"{width}\" cellpadding=\"0\" cellspacing=\"0\" border=\"0\" \
         style=\"max-width:{width}px;width:100%;font-family:{font};color:{text};\">\n\
         {rows_html}\
         </table>\n\
         </td></tr>\n\
         </table>\n\
         </body>\n\
         </html>",
        bg = settings.background_color,
        width = settings.content_width,
        font = settings.font_family,
        text = settings.text_color,
    )
}

fn render_row(
    row: &Row,
    settings: &GlobalSettings,
    options: &RenderOptions,
    ctx: &mut RenderContext,
) -> String {
    let ratios = row.layout.ratios();

    if row.columns.len() > 1 {
        // Stacking breakpoint, emitted once for the whole document.
        ctx.push_style(
            "@media only screen and (max-width: 480px) {\n  \
             .mc-col { display: block !important; width: 100% !important; }\n}",
        );
    }

    let mut cells = String::new();
    for (i, column) in row.columns.iter().enumerate() {
        let width = ratios.get(i).copied().unwrap_or(100.0 / row.columns.len() as f32);
        let _ = write!(
            cells,
            "<td class=\"mc-col\" width=\"{width:.0}%\" valign=\"top\" style=\"width:{width:.2}%;\">{}</td>",
            render_column(column, settings, options, ctx)
        );
    }

    let background = row
        .background_color
        .as_ref()
        .map(|c| format!("background-color:{c};"))
        .unwrap_or_default();

    format!(
        "<tr><td style=\"padding:{};{}\">\n\
         <table role=\"presentation\" width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" border=\"0\"><tr>{}</tr></table>\n\
         </td></tr>\n",
        render_padding(row.padding),
        background,
        cells
    )
}

fn render_column(
    column: &Column,
    settings: &GlobalSettings,
    options: &RenderOptions,
    _ctx: &mut RenderContext,
) -> String {
    column
        .blocks
        .iter()
        .map(|block| render_block(block, settings, options))
        .collect()
}

/// Render one block; exhaustive over every known variant
fn render_block(block: &Block, settings: &GlobalSettings, options: &RenderOptions) -> String {
    match block {
        Block::Heading {
            text,
            level,
            color,
            align,
            padding,
        } => {
            let level = (*level).clamp(1, 3);
            let color = color.as_deref().unwrap_or(&settings.text_color);
            format!(
                "<div style=\"padding:{};\"><h{level} style=\"margin:0;color:{color};text-align:{};\">{}</h{level}></div>",
                render_padding(*padding),
                align.as_css(),
                escape_html(text),
            )
        }
        Block::Paragraph {
            text,
            color,
            font_size,
            align,
            padding,
        } => {
            let color = color.as_deref().unwrap_or(&settings.text_color);
            format!(
                "<div style=\"padding:{};\"><p style=\"margin:0;color:{color};font-size:{font_size}px;line-height:1.6;text-align:{};\">{}</p></div>",
                render_padding(*padding),
                align.as_css(),
                escape_html(text),
            )
        }
        Block::Button {
            text,
            url,
            background_color,
            text_color,
            border_radius,
            align,
            padding,
        } => format!(
            "<div style=\"padding:{};text-align:{};\">\
             <a href=\"{}\" target=\"_blank\" \
             style=\"display:inline-block;padding:12px 24px;background-color:{background_color};\
             color:{text_color};text-decoration:none;border-radius:{border_radius}px;\">{}</a></div>",
            render_padding(*padding),
            align.as_css(),
            url,
            escape_html(text),
        ),
        Block::Image {
            url,
            alt,
            width,
            align,
            padding,
        } => {
            let src = normalize_url(url, options.base_url.as_deref());
            let width_attr = width
                .map(|w| format!(" width=\"{w}\""))
                .unwrap_or_else(|| " width=\"100%\"".to_string());
            format!(
                "<div style=\"padding:{};text-align:{};\"><img src=\"{src}\" alt=\"{}\"{width_attr} style=\"max-width:100%;border:0;\" /></div>",
                render_padding(*padding),
                align.as_css(),
                escape_html(alt),
            )
        }
        Block::List {
            items,
            ordered,
            color,
            padding,
        } => {
            let color = color.as_deref().unwrap_or(&settings.text_color);
            let tag = if *ordered { "ol" } else { "ul" };
            let items_html: String = items
                .iter()
                .map(|item| format!("<li>{}</li>", escape_html(item)))
                .collect();
            format!(
                "<div style=\"padding:{};\"><{tag} style=\"margin:0;padding-left:24px;color:{color};\">{items_html}</{tag}></div>",
                render_padding(*padding),
            )
        }
        Block::Divider {
            color,
            thickness,
            width_percent,
            style,
            align,
            padding,
        } => format!(
            "<div style=\"padding:{};text-align:{};\">\
             <hr style=\"display:inline-block;width:{width_percent}%;border:none;\
             border-top:{thickness}px {} {color};margin:0;\" /></div>",
            render_padding(*padding),
            align.as_css(),
            style.as_css(),
        ),
        Block::Spacer { height } => {
            format!("<div style=\"height:{height}px;line-height:{height}px;font-size:1px;\">&nbsp;</div>")
        }
        Block::ProductLine {
            name,
            description,
            price,
            image_url,
            padding,
        } => {
            let image = image_url
                .as_ref()
                .map(|url| {
                    let src = normalize_url(url, options.base_url.as_deref());
                    format!(
                        "<td width=\"96\" valign=\"top\"><img src=\"{src}\" alt=\"{}\" width=\"80\" style=\"border:0;\" /></td>",
                        escape_html(name)
                    )
                })
                .unwrap_or_default();
            let description = description
                .as_ref()
                .map(|d| format!("<p style=\"margin:4px 0 0;font-size:14px;\">{}</p>", escape_html(d)))
                .unwrap_or_default();
            let price = price
                .as_ref()
                .map(|p| format!("<td align=\"right\" valign=\"top\"><strong>{}</strong></td>", escape_html(p)))
                .unwrap_or_default();
            format!(
                "<div style=\"padding:{};\">\
                 <table role=\"presentation\" width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" border=\"0\"><tr>\
                 {image}<td valign=\"top\"><strong>{}</strong>{description}</td>{price}\
                 </tr></table></div>",
                render_padding(*padding),
                escape_html(name),
            )
        }
        Block::Socials {
            links,
            align,
            padding,
        } => {
            let links_html: String = links
                .iter()
                .map(|link| render_social_link(link, options))
                .collect();
            format!(
                "<div style=\"padding:{};text-align:{};\">{links_html}</div>",
                render_padding(*padding),
                align.as_css(),
            )
        }
        Block::Unknown => String::new(),
    }
}

fn render_social_link(link: &SocialLink, options: &RenderOptions) -> String {
    match &link.icon_url {
        Some(icon) => {
            let src = normalize_url(icon, options.base_url.as_deref());
            format!(
                "<a href=\"{}\" target=\"_blank\" style=\"margin:0 6px;\"><img src=\"{src}\" alt=\"{}\" width=\"24\" height=\"24\" style=\"border:0;\" /></a>",
                link.url,
                escape_html(&link.network),
            )
        }
        None => format!(
            "<a href=\"{}\" target=\"_blank\" style=\"margin:0 6px;\">{}</a>",
            link.url,
            escape_html(&link.network),
        ),
    }
}

/// Render a padding box as `top right bottom left` in pixels
#[must_use]
pub fn render_padding(padding: Padding) -> String {
    format!(
        "{}px {}px {}px {}px",
        padding.top, padding.right, padding.bottom, padding.left
    )
}

/// Resolve a root-relative URL against a base URL
///
/// Absolute URLs pass through untouched; a trailing slash on the base is
/// stripped before joining.
#[must_use]
pub fn normalize_url(url: &str, base_url: Option<&str>) -> String {
    match base_url {
        Some(base) if url.starts_with('/') => {
            let base = base.strip_suffix('/').unwrap_or(base);
            format!("{base}{url}")
        }
        _ => url.to_string(),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{BorderStyle, Row, RowId, RowLayout};

    fn doc_with_blocks(blocks: Vec<Block>) -> EmailDesignDocument {
        EmailDesignDocument {
            settings: GlobalSettings::default(),
            rows: vec![Row {
                id: RowId::new(),
                layout: RowLayout::Single,
                padding: Padding::default(),
                background_color: None,
                columns: vec![Column { blocks }],
            }],
        }
    }

    #[test]
    fn test_render_padding() {
        assert_eq!(render_padding(Padding::default()), "0px 0px 0px 0px");
        let padding = Padding {
            top: 10,
            right: 20,
            bottom: 30,
            left: 40,
        };
        assert_eq!(render_padding(padding), "10px 20px 30px 40px");
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("/img/logo.png", Some("https://app.example.com")),
            "https://app.example.com/img/logo.png"
        );
        assert_eq!(
            normalize_url("/img/logo.png", Some("https://app.example.com/")),
            "https://app.example.com/img/logo.png"
        );
        assert_eq!(
            normalize_url("https://cdn.example.com/a.png", Some("https://app.example.com")),
            "https://cdn.example.com/a.png"
        );
        assert_eq!(normalize_url("/img/logo.png", None), "/img/logo.png");
    }

    #[test]
    fn test_unknown_block_renders_nothing() {
        let json = serde_json::json!({ "type": "hologram", "depth": 3 });
        let block: Block = serde_json::from_value(json).unwrap();
        let with_unknown = render(&doc_with_blocks(vec![block]), &RenderOptions::default());
        let without = render(&doc_with_blocks(vec![]), &RenderOptions::default());
        assert_eq!(with_unknown, without);
        assert!(with_unknown.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_button_renders_box_model() {
        let html = render(
            &doc_with_blocks(vec![Block::Button {
                text: "Shop".into(),
                url: "https://shop.example.com".into(),
                background_color: "#111111".into(),
                text_color: "#eeeeee".into(),
                border_radius: 6,
                align: Alignment::Center,
                padding: Padding {
                    top: 1,
                    right: 2,
                    bottom: 3,
                    left: 4,
                },
            }]),
            &RenderOptions::default(),
        );
        assert!(html.contains("padding:1px 2px 3px 4px;"));
        assert!(html.contains("href=\"https://shop.example.com\""));
        assert!(html.contains("border-radius:6px"));
    }

    #[test]
    fn test_divider_style() {
        let html = render(
            &doc_with_blocks(vec![Block::Divider {
                color: "#ff0000".into(),
                thickness: 2,
                width_percent: 80,
                style: BorderStyle::Dashed,
                align: Alignment::Center,
                padding: Padding::default(),
            }]),
            &RenderOptions::default(),
        );
        assert!(html.contains("border-top:2px dashed #ff0000"));
        assert!(html.contains("width:80%"));
    }

    #[test]
    fn test_image_src_normalized_against_base_url() {
        let html = render(
            &doc_with_blocks(vec![Block::Image {
                url: "/uploads/banner.png".into(),
                alt: "Banner".into(),
                width: Some(560),
                align: Alignment::Center,
                padding: Padding::default(),
            }]),
            &RenderOptions {
                base_url: Some("https://app.example.com".into()),
            },
        );
        assert!(html.contains("src=\"https://app.example.com/uploads/banner.png\""));
    }

    #[test]
    fn test_responsive_styles_emitted_once() {
        let multi_column_row = || Row {
            id: RowId::new(),
            layout: RowLayout::TwoEqual,
            padding: Padding::default(),
            background_color: None,
            columns: vec![Column::default(), Column::default()],
        };
        let design = EmailDesignDocument {
            settings: GlobalSettings::default(),
            rows: vec![multi_column_row(), multi_column_row(), multi_column_row()],
        };
        let html = render(&design, &RenderOptions::default());
        assert_eq!(html.matches("@media only screen").count(), 1);
    }

    #[test]
    fn test_text_is_escaped() {
        let html = render(
            &doc_with_blocks(vec![Block::Paragraph {
                text: "1 < 2 & 3 > 2".into(),
                color: None,
                font_size: 16,
                align: Alignment::Left,
                padding: Padding::default(),
            }]),
            &RenderOptions::default(),
        );
        assert!(html.contains("1 &lt; 2 &amp; 3 &gt; 2"));
    }

    #[test]
    fn test_merge_tags_survive_rendering() {
        let html = render(
            &doc_with_blocks(vec![Block::Paragraph {
                text: "Hi {{contact.first_name}}".into(),
                color: None,
                font_size: 16,
                align: Alignment::Left,
                padding: Padding::default(),
            }]),
            &RenderOptions::default(),
        );
        assert!(html.contains("Hi {{contact.first_name}}"));
    }
}
