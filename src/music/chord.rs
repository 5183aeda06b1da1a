/// 名前付きコード音程セット
///
/// ピッチセレクタを離散ノートへ量子化するためのオクターブ内オフセット表。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordIntervals {
    pub name: &'static str,
    /// ルートからの半音オフセット（オクターブごとに繰り返す）
    pub offsets: &'static [u8],
}

/// デフォルトセット = クロマチック（事実上の量子化なし）
pub const DEFAULT_CHORD_NAME: &str = "chromatic";

const CHORD_TABLE: &[ChordIntervals] = &[
    ChordIntervals {
        name: "chromatic",
        offsets: &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
    },
    ChordIntervals {
        name: "major",
        offsets: &[0, 4, 7],
    },
    ChordIntervals {
        name: "minor",
        offsets: &[0, 3, 7],
    },
    ChordIntervals {
        name: "major7",
        offsets: &[0, 4, 7, 11],
    },
    ChordIntervals {
        name: "minor7",
        offsets: &[0, 3, 7, 10],
    },
    ChordIntervals {
        name: "sus4",
        offsets: &[0, 5, 7],
    },
    ChordIntervals {
        name: "pentatonic",
        offsets: &[0, 2, 4, 7, 9],
    },
    ChordIntervals {
        name: "blues",
        offsets: &[0, 3, 5, 6, 7, 10],
    },
];

/// コード名から音程セットを引く
///
/// 未知の名前・空文字はデフォルトセットへサイレントにフォールバックし、
/// 再生を止めない。
pub fn chord_for(name: &str) -> ChordIntervals {
    CHORD_TABLE
        .iter()
        .find(|c| c.name == name)
        .copied()
        .unwrap_or_else(|| chord_for(DEFAULT_CHORD_NAME))
}

/// 選択可能なコード名の一覧（UIのサイクル切り替え用）
pub fn chord_names() -> Vec<&'static str> {
    CHORD_TABLE.iter().map(|c| c.name).collect()
}
