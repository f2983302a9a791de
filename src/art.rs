//! Header banners. Each style is a list of frames the tick cycles through.

const WORDMARK: [&str; 3] = [
	"╦ ╦╔═╗╦═╗╔═╗╔═╗",
	"║║║╠═╣╠╦╝╠═╝╠═╝",
	"╚╩╝╩ ╩╩╚═╩  ╩  ",
];

const FLAMES: [&str; 4] = [
	" ) ( (  ) ( ) ",
	"( ) ) (  ( ) )",
	" ( ( ) ) ) ( (",
	") ) ( ( ( ) ) ",
];

const BLOCK_SHADES: [&str; 4] = ["░", "▒", "▓", "█"];

pub const STYLES: [&str; 3] = ["fire", "blocks", "minimal"];

/// Frames for the named banner style. Unknown names fall back to `fire`.
pub fn frames(style: &str) -> Vec<String> {
	match style {
		"blocks" => blocks(),
		"minimal" => vec!["warpp".to_string()],
		_ => fire(),
	}
}

fn fire() -> Vec<String> {
	FLAMES
		.iter()
		.map(|flame| {
			let mut lines = vec![flame.to_string()];
			lines.extend(WORDMARK.iter().map(|l| l.to_string()));
			lines.join("\n")
		})
		.collect()
}

fn blocks() -> Vec<String> {
	let width = WORDMARK[0].chars().count();
	(0..BLOCK_SHADES.len())
		.map(|phase| {
			let bar: String = (0..width)
				.map(|i| BLOCK_SHADES[(i + phase) % BLOCK_SHADES.len()])
				.collect();
			let mut lines: Vec<String> = WORDMARK.iter().map(|l| l.to_string()).collect();
			lines.push(bar);
			lines.join("\n")
		})
		.collect()
}
