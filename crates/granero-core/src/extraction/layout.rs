use super::PositionedToken;

/// Separator placed on its own line between pages.
pub const PAGE_BREAK: char = '\x0c';

/// Horizontal gap, in points, rendered as a column break.
const COLUMN_GAP: f32 = 12.0;

/// Turn positioned words back into report text.
///
/// Tokens are ordered by page, then top to bottom, then left to right. A new
/// line starts whenever the vertical position moves by more than `line_gap`
/// from the first word of the current line. Wide horizontal gaps become
/// three spaces so header labels and values in other columns stay apart.
pub fn assemble_text(tokens: &[PositionedToken], line_gap: f32) -> String {
    let mut sorted: Vec<&PositionedToken> = tokens
        .iter()
        .filter(|t| !t.text.trim().is_empty())
        .collect();
    sorted.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then_with(|| a.y.total_cmp(&b.y))
            .then_with(|| a.x.total_cmp(&b.x))
    });

    let mut pages: Vec<Vec<Vec<&PositionedToken>>> = Vec::new();
    let mut current_page = None;
    for token in sorted {
        if current_page != Some(token.page) {
            current_page = Some(token.page);
            pages.push(Vec::new());
        }
        let Some(lines) = pages.last_mut() else {
            continue;
        };
        match lines.last_mut() {
            Some(line) if (token.y - line[0].y).abs() <= line_gap => line.push(token),
            _ => lines.push(vec![token]),
        }
    }

    let rendered: Vec<String> = pages
        .into_iter()
        .map(|lines| {
            lines
                .into_iter()
                .map(render_line)
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect();
    let separator = format!("\n{}\n", PAGE_BREAK);
    rendered.join(separator.as_str())
}

fn render_line(mut line: Vec<&PositionedToken>) -> String {
    line.sort_by(|a, b| a.x.total_cmp(&b.x));
    let mut out = String::new();
    let mut prev_end: Option<f32> = None;
    for token in line {
        if let Some(end) = prev_end {
            if token.x - end > COLUMN_GAP {
                out.push_str("   ");
            } else {
                out.push(' ');
            }
        }
        out.push_str(token.text.trim());
        prev_end = Some(token.x + token.width);
    }
    out
}
