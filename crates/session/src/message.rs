//! Cleanup of terminal escape sequences in step messages.
//!
//! Gateways reuse text written for terminal prompts, so messages can carry
//! OSC 8 hyperlinks and colour codes. These are rewritten to plain markdown
//! before a renderer's markdown pipeline sees them.

const ESC: char = '\x1b';
const BEL: char = '\x07';
const OSC8: &str = "\x1b]8;;";
const OSC8_CLOSE: &str = "\x1b]8;;\x07";
const BARE_OSC8: &str = "]8;;";

/// Convert hyperlinks to markdown and strip every other escape sequence.
pub fn clean_terminal_markup(text: &str) -> String {
    let linked = convert_osc8_links(text);
    let linked = convert_bare_links(&linked);
    strip_escapes(&linked)
}

fn render_link(url: &str, label: &str) -> String {
    let url = url.trim();
    let label = label.trim();
    if url.is_empty() {
        label.to_string()
    } else if label.is_empty() || label == url {
        url.to_string()
    } else {
        format!("[{label}]({url})")
    }
}

/// `ESC]8;;URL BEL label ESC]8;; BEL`
fn convert_osc8_links(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find(OSC8) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OSC8.len()..];
        match parse_osc8_link(after) {
            Some((url, label, consumed)) => {
                out.push_str(&render_link(url, label));
                rest = &after[consumed..];
            },
            None => {
                out.push_str(OSC8);
                rest = after;
            },
        }
    }
    out.push_str(rest);
    out
}

fn parse_osc8_link(after: &str) -> Option<(&str, &str, usize)> {
    let url_end = after.find(BEL)?;
    let url = &after[..url_end];
    let label_start = url_end + BEL.len_utf8();
    let label_len = after[label_start..].find(ESC)?;
    let label = &after[label_start..label_start + label_len];
    let close_start = label_start + label_len;
    after[close_start..]
        .starts_with(OSC8_CLOSE)
        .then_some((url, label, close_start + OSC8_CLOSE.len()))
}

/// `]8;;URL label]8;;`, left behind when the ESC bytes were already removed.
fn convert_bare_links(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find(BARE_OSC8) {
        out.push_str(&rest[..start]);
        let after = &rest[start + BARE_OSC8.len()..];
        match parse_bare_link(after) {
            Some((url, label, consumed)) => {
                out.push_str(&render_link(url, label));
                rest = &after[consumed..];
            },
            None => {
                out.push_str(BARE_OSC8);
                rest = after;
            },
        }
    }
    out.push_str(rest);
    out
}

fn parse_bare_link(after: &str) -> Option<(&str, &str, usize)> {
    let scheme_len = ["https://", "http://"]
        .iter()
        .find(|scheme| after.starts_with(**scheme))?
        .len();
    let url_len = after[scheme_len..]
        .find(|c: char| c.is_whitespace() || c == BEL || c == ']')
        .unwrap_or(after.len() - scheme_len);
    if url_len == 0 {
        return None;
    }
    let url_end = scheme_len + url_len;
    let url = &after[..url_end];

    let mut label_start = url_end;
    if after[label_start..].starts_with(BEL) {
        label_start += BEL.len_utf8();
    }
    let label_len = after[label_start..].find(']')?;
    let label = &after[label_start..label_start + label_len];
    let close_start = label_start + label_len;
    after[close_start..]
        .starts_with(BARE_OSC8)
        .then_some((url, label, close_start + BARE_OSC8.len()))
}

/// Remove CSI (`ESC[...letter`) and OSC (`ESC]...BEL`) sequences, then any
/// stray ESC or BEL.
fn strip_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find([ESC, BEL]) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let skip = if tail.starts_with(BEL) {
            BEL.len_utf8()
        } else {
            escape_len(tail)
        };
        rest = &tail[skip..];
    }
    out.push_str(rest);
    out
}

/// Byte length of the escape sequence at the start of `tail` (which begins
/// with ESC). Unterminated sequences only lose their ESC byte.
fn escape_len(tail: &str) -> usize {
    let body = &tail[ESC.len_utf8()..];
    if let Some(params) = body.strip_prefix('[') {
        let param_len = params
            .find(|c: char| !(c.is_ascii_digit() || c == ';'))
            .unwrap_or(params.len());
        if params[param_len..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            return ESC.len_utf8() + 1 + param_len + 1;
        }
    } else if let Some(osc) = body.strip_prefix(']')
        && let Some(end) = osc.find(BEL)
    {
        return ESC.len_utf8() + 1 + end + BEL.len_utf8();
    }
    ESC.len_utf8()
}
