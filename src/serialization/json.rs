//! JSON vocabulary format (`{"symbol": index}`), in the style of `vocab.json` files.

use std::fs;
use std::path::Path;

use log::warn;
use serde_json::{Map, Value};

use crate::error::{BpeError, Result};
use crate::vocab::Vocabulary;

/// Builds the JSON object for `vocab`. When stripping makes two spellings identical, the first
/// index wins and the collision is logged.
#[must_use]
pub fn vocab_json(vocab: &Vocabulary, strip: Option<&str>) -> Value {
    let mut map = Map::with_capacity(vocab.len());
    for (index, spelling) in vocab.spellings(strip) {
        if map.contains_key(&*spelling) {
            warn!("symbol {spelling:?} (index {index}) collides after marker stripping; keeping the first index");
            continue;
        }
        map.insert(spelling.into_owned(), Value::from(index));
    }
    Value::Object(map)
}

/// Writes the pretty-printed JSON vocabulary to `path`.
pub fn save_vocab_json<P: AsRef<Path>>(
    path: P,
    vocab: &Vocabulary,
    strip: Option<&str>,
) -> Result<()> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(&vocab_json(vocab, strip))?;
    fs::write(path, text).map_err(|err| BpeError::io(err, Some(path.to_path_buf())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainerConfig;
    use crate::symbols::SymbolTable;
    use crate::table::VocabTable;
    use crate::vocab::VocabOrder;

    #[test]
    fn json_maps_symbol_to_index() {
        let cfg = TrainerConfig::builder()
            .start_marker(None::<String>)
            .attach_end_marker(true)
            .show_progress(false)
            .build()
            .unwrap();
        let mut symbols = SymbolTable::new();
        let table = VocabTable::from_corpus("ab b", &cfg, &mut symbols).unwrap();
        let vocab = Vocabulary::extract(&table, &symbols, VocabOrder::Lexicographic);

        let value = vocab_json(&vocab, None);
        assert_eq!(value["a"], 0);
        assert_eq!(value["b</w>"], 1);

        let stripped = vocab_json(&vocab, Some("</w>"));
        assert_eq!(stripped["b"], 1);
        assert_eq!(stripped.as_object().unwrap().len(), 2);
    }
}
