//! Static glyph tables for status lines.

use audiograb_core::Icon;

pub struct IconTable {
    entries: &'static [(Icon, &'static str)],
    pub stats: &'static str,
    pub folder: &'static str,
}

impl IconTable {
    pub fn glyph(&self, icon: Icon) -> &'static str {
        self.entries
            .iter()
            .find(|(key, _)| *key == icon)
            .map(|(_, glyph)| *glyph)
            .unwrap_or("")
    }
}

pub static EMOJI: IconTable = IconTable {
    entries: &[
        (Icon::Music, "🎵"),
        (Icon::Playlist, "🎼"),
        (Icon::Folder, "📂"),
        (Icon::Rocket, "🚀"),
        (Icon::Download, "⬇️"),
        (Icon::Success, "✅"),
        (Icon::Skip, "⏭️"),
        (Icon::Warning, "⚠️"),
        (Icon::Error, "❌"),
        (Icon::Cancel, "⏹️"),
        (Icon::Celebrate, "🎉"),
    ],
    stats: "📈",
    folder: "📂",
};

pub static ASCII: IconTable = IconTable {
    entries: &[
        (Icon::Music, "[~]"),
        (Icon::Playlist, "[#]"),
        (Icon::Folder, "[>]"),
        (Icon::Rocket, "[*]"),
        (Icon::Download, "[v]"),
        (Icon::Success, "[ok]"),
        (Icon::Skip, "[-]"),
        (Icon::Warning, "[!]"),
        (Icon::Error, "[x]"),
        (Icon::Cancel, "[.]"),
        (Icon::Celebrate, "[=]"),
    ],
    stats: "[stats]",
    folder: "[dir]",
};
