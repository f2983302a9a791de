//! Pane capture for the preview panel and ANSI-aware line truncation.

use crate::env::Environment;
use crate::model::PaneInfo;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_width::UnicodeWidthChar;

pub const ELLIPSIS: &str = "…";
pub const RESET: &str = "\x1b[0m";
pub const PANE_SEPARATOR: &str = "─";
/// Panes never get fewer preview lines than this, even if the total overflows.
pub const MIN_PANE_HEIGHT: usize = 3;

static ANSI_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"\x1b(?:\[[\x30-\x3f]*[\x20-\x2f]*[\x40-\x7e]|\][^\x07\x1b]*(?:\x07|\x1b\\)|[\x40-\x5f])")
		.unwrap()
});

pub fn strip_ansi(s: &str) -> String {
	ANSI_RE.replace_all(s, "").into_owned()
}

/// Byte length of the escape sequence at the start of `s` (which begins with ESC).
/// An unterminated sequence runs to the end of the string.
fn escape_len(s: &str) -> usize {
	let b = s.as_bytes();
	match b.get(1) {
		// CSI: parameters, then one final byte in 0x40..=0x7e
		Some(b'[') => b[2..]
			.iter()
			.position(|c| (0x40..=0x7e).contains(c))
			.map_or(b.len(), |p| p + 3),
		// OSC: ends with BEL or ST (ESC \)
		Some(b']') => {
			let mut j = 2;
			while j < b.len() {
				if b[j] == 0x07 {
					return j + 1;
				}
				if b[j] == 0x1b && b.get(j + 1) == Some(&b'\\') {
					return j + 2;
				}
				j += 1;
			}
			b.len()
		}
		Some(c) if c.is_ascii() => 2,
		_ => 1,
	}
}

/// Cut `s` to `max_width` terminal cells.
///
/// Wide glyphs cost two cells and combining marks none. A glyph that would
/// cross the budget is dropped whole. Escape sequences cost nothing and are
/// never split. When visible text is
/// dropped, an ellipsis and a reset are appended so styles do not leak into the
/// next line. Escape sequences between the last kept character and the cut
/// are kept.
pub fn truncate_visible(s: &str, max_width: usize) -> String {
	if max_width == 0 {
		return String::new();
	}

	let mut out = String::with_capacity(s.len() + ELLIPSIS.len() + RESET.len());
	let mut visible = 0;
	let mut rest = s;
	while let Some(ch) = rest.chars().next() {
		if ch == '\x1b' {
			let len = escape_len(rest);
			out.push_str(&rest[..len]);
			rest = &rest[len..];
			continue;
		}
		let width = ch.width().unwrap_or(0);
		if visible + width > max_width {
			break;
		}
		out.push(ch);
		visible += width;
		rest = &rest[ch.len_utf8()..];
	}

	if !rest.is_empty() {
		out.push_str(ELLIPSIS);
		out.push_str(RESET);
	}
	out
}

/// Lines each pane gets when `total` lines are shared by `panes` panes with a
/// one-line separator between neighbours.
pub fn pane_height(total: usize, panes: usize) -> usize {
	let panes = panes.max(1);
	let available = total.saturating_sub(panes - 1);
	(available / panes).max(MIN_PANE_HEIGHT)
}

/// The last `height` non-trailing-blank lines of a capture, each truncated to `width`.
pub fn tail_lines(content: &str, height: usize, width: usize) -> Vec<String> {
	let lines: Vec<&str> = content.lines().collect();
	let end = lines
		.iter()
		.rposition(|l| !strip_ansi(l).trim().is_empty())
		.map_or(0, |p| p + 1);
	let start = end.saturating_sub(height);
	lines[start..end]
		.iter()
		.map(|l| truncate_visible(l, width))
		.collect()
}

/// Stack pane captures with separator rules between them.
pub fn compose_preview(panes: &[PaneInfo], height_per_pane: usize, width: usize) -> Vec<String> {
	let mut out = Vec::new();
	for (i, pane) in panes.iter().enumerate() {
		out.extend(tail_lines(&pane.content, height_per_pane, width));
		if i + 1 < panes.len() {
			out.push(PANE_SEPARATOR.repeat(width));
		}
	}
	out
}

/// Raw pane text with escape sequences kept. Failures give an empty string.
pub fn capture(env: &dyn Environment, session: &str, pane_index: usize, max_lines: usize) -> String {
	env.capture_content(session, Some(pane_index), max_lines, true)
		.unwrap_or_else(|e| {
			tracing::debug!(session, pane_index, error = %e, "pane capture failed");
			String::new()
		})
}

/// Preview lines for every pane of the active window of `session`.
pub fn capture_preview(
	env: &dyn Environment,
	session: &str,
	total_height: usize,
	width: usize,
) -> Vec<String> {
	let panes = env.session_panes(session).unwrap_or_default();
	if panes.is_empty() {
		let content = env
			.capture_content(session, None, total_height, true)
			.unwrap_or_default();
		return tail_lines(&content, total_height, width);
	}

	let height = pane_height(total_height, panes.len());
	let panes: Vec<PaneInfo> = panes
		.into_iter()
		.map(|pane| PaneInfo {
			content: capture(env, session, pane.index, height),
			index: pane.index,
		})
		.collect();
	compose_preview(&panes, height, width)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::env::fake::FakeEnv;

	/// Every ESC in `out` starts a complete sequence.
	fn assert_no_split_escape(out: &str) {
		let mut rest = out;
		while let Some(pos) = rest.find('\x1b') {
			let seq = &rest[pos..];
			let len = escape_len(seq);
			let b = seq.as_bytes();
			match b.get(1) {
				Some(b'[') => assert!(
					(0x40..=0x7e).contains(&b[len - 1]),
					"split CSI in {out:?}"
				),
				Some(b']') => assert!(
					b[len - 1] == 0x07 || b[len - 1] == b'\\',
					"split OSC in {out:?}"
				),
				_ => {}
			}
			rest = &seq[len..];
		}
	}

	#[test]
	fn test_truncate_colored_text() {
		assert_eq!(
			truncate_visible("\x1b[31mHello\x1b[0m", 3),
			"\x1b[31mHel…\x1b[0m"
		);
	}

	#[test]
	fn test_truncate_zero_width() {
		assert_eq!(truncate_visible("Hello", 0), "");
		assert_eq!(truncate_visible("\x1b[31m", 0), "");
	}

	#[test]
	fn test_truncate_fits() {
		assert_eq!(truncate_visible("Hello", 5), "Hello");
		assert_eq!(truncate_visible("Hello", 80), "Hello");
		assert_eq!(truncate_visible("", 3), "");
	}

	#[test]
	fn test_trailing_escapes_are_not_truncation() {
		assert_eq!(truncate_visible("Hel\x1b[0m", 3), "Hel\x1b[0m");
		assert_eq!(
			truncate_visible("\x1b[1m\x1b[38;5;208m\x1b[48;2;1;2;3m\x1b[0m", 2),
			"\x1b[1m\x1b[38;5;208m\x1b[48;2;1;2;3m\x1b[0m"
		);
	}

	#[test]
	fn test_truncate_plain_text() {
		assert_eq!(truncate_visible("abcdef", 4), "abcd…\x1b[0m");
	}

	#[test]
	fn test_truncate_multibyte() {
		assert_eq!(truncate_visible("✻ Baking…", 3), "✻ B…\x1b[0m");
	}

	#[test]
	fn test_truncate_keeps_osc_whole() {
		let link = "\x1b]8;;https://example.com\x07link\x1b]8;;\x07 tail";
		let out = truncate_visible(link, 4);
		assert_eq!(out, "\x1b]8;;https://example.com\x07link\x1b]8;;\x07…\x1b[0m");
	}

	/// Terminal cells outside escape sequences.
	fn scanned_width(s: &str) -> usize {
		let mut cells = 0;
		let mut rest = s;
		while let Some(ch) = rest.chars().next() {
			if ch == '\x1b' {
				rest = &rest[escape_len(rest)..];
			} else {
				cells += ch.width().unwrap_or(0);
				rest = &rest[ch.len_utf8()..];
			}
		}
		cells
	}

	#[test]
	fn test_truncate_counts_cells_not_chars() {
		assert_eq!(truncate_visible("日本語テキスト", 4), "日本…\x1b[0m");
		// the third glyph would need cells 5 and 6
		assert_eq!(truncate_visible("日本語テキスト", 5), "日本…\x1b[0m");
		assert_eq!(truncate_visible("\x1b[1m🚀 go\x1b[0m", 2), "\x1b[1m🚀…\x1b[0m");
		assert_eq!(truncate_visible("e\u{301}cole", 1), "e\u{301}…\x1b[0m");
		assert_eq!(truncate_visible("cafe\u{301}", 4), "cafe\u{301}");
	}

	#[test]
	fn test_truncate_properties_over_table() {
		let marker = format!("{ELLIPSIS}{RESET}");
		let inputs = [
			"\x1b[31mHello\x1b[0m world",
			"\x1b[1;32m✔\x1b[0m tests passed \x1b[2m(12s)\x1b[0m",
			"plain text that is fairly long",
			"\x1b[38;5;208m· Pondering… (esc to interrupt)\x1b[39m",
			"\x1b]0;title\x1b\\after the title",
			"a\x1bMb",
			"日本語テキスト",
			"\x1b[33m🚀 deploy\x1b[0m 完了 ✅",
			"e\u{301}cole d'e\u{301}te\u{301}\u{200b}!",
			"\x1b[0m\x1b[0m\x1b[0m",
			"",
		];
		for input in inputs {
			for width in 0..40 {
				let out = truncate_visible(input, width);
				let kept = out.strip_suffix(marker.as_str()).unwrap_or(&out);
				assert!(
					scanned_width(kept) <= width,
					"{input:?} at {width} gave {out:?}"
				);
				assert_no_split_escape(&out);
				if width > 0 && scanned_width(input) <= width {
					assert_eq!(out, input);
				}
			}
		}
	}

	#[test]
	fn test_strip_ansi() {
		assert_eq!(strip_ansi("\x1b[31mred\x1b[0m plain"), "red plain");
		assert_eq!(strip_ansi("\x1b]0;title\x07body"), "body");
		assert_eq!(strip_ansi("\x1b[1m✻\x1b[0m ok").chars().count(), 4);
	}

	#[test]
	fn test_pane_height() {
		assert_eq!(pane_height(20, 1), 20);
		assert_eq!(pane_height(20, 2), 9);
		assert_eq!(pane_height(20, 4), 4);
		// crowded: clamps to the minimum and overflows the available height
		assert_eq!(pane_height(10, 4), MIN_PANE_HEIGHT);
		assert!(pane_height(10, 4) * 4 + 3 > 10);
		assert_eq!(pane_height(10, 0), 10);
	}

	#[test]
	fn test_tail_lines_drops_trailing_blank_rows() {
		let content = "one\ntwo\nthree\nfour\n\n   \n";
		assert_eq!(tail_lines(content, 2, 10), vec!["three", "four"]);
		assert_eq!(tail_lines(content, 10, 3), vec!["one", "two", "thr…\x1b[0m", "fou…\x1b[0m"]);
		assert!(tail_lines("", 5, 10).is_empty());
	}

	#[test]
	fn test_capture_preview_multiple_panes() {
		let mut env = FakeEnv::default();
		env.window_panes.insert("api".to_string(), vec![0, 1]);
		env.contents
			.insert(("api".to_string(), 0), "a1\na2\na3\na4\na5\n".to_string());
		env.contents
			.insert(("api".to_string(), 1), "\x1b[32mb1\x1b[0m\n".to_string());

		let lines = capture_preview(&env, "api", 9, 6);
		// 9 lines shared by two panes and one separator: 4 each
		assert_eq!(
			lines,
			vec!["a2", "a3", "a4", "a5", "──────", "\x1b[32mb1\x1b[0m"]
		);
	}

	#[test]
	fn test_capture_preview_falls_back_to_active_pane() {
		let mut env = FakeEnv::default();
		env.contents
			.insert(("solo".to_string(), 0), "x\ny\n".to_string());
		assert_eq!(capture_preview(&env, "solo", 5, 10), vec!["x", "y"]);
	}
}
