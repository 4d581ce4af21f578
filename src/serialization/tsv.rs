//! Plain-text vocabulary (`<index>\t<symbol>`) and merge list formats.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{BpeError, Result};
use crate::vocab::Vocabulary;

/// Writes one `<index>\t<symbol>\n` record per symbol. An empty vocabulary writes nothing.
pub fn write_vocab_tsv<W: Write>(
    writer: &mut W,
    vocab: &Vocabulary,
    strip: Option<&str>,
) -> std::io::Result<()> {
    for (index, spelling) in vocab.spellings(strip) {
        writeln!(writer, "{index}\t{spelling}")?;
    }
    Ok(())
}

/// Writes the vocabulary to `path`, truncating any existing file.
pub fn save_vocab_tsv<P: AsRef<Path>>(
    path: P,
    vocab: &Vocabulary,
    strip: Option<&str>,
) -> Result<()> {
    let path = path.as_ref();
    let io_err = |err| BpeError::io(err, Some(path.to_path_buf()));
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    write_vocab_tsv(&mut writer, vocab, strip).map_err(io_err)?;
    writer.flush().map_err(io_err)
}

/// Reads a vocabulary written by [`save_vocab_tsv`] back as `(index, symbol)` records.
pub fn read_vocab_tsv<P: AsRef<Path>>(path: P) -> Result<Vec<(usize, String)>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| BpeError::io(err, Some(path.to_path_buf())))?;
    let mut records = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|err| BpeError::io(err, Some(path.to_path_buf())))?;
        let (index, symbol) = line.split_once('\t').ok_or_else(|| {
            BpeError::Serialization(format!(
                "{}:{}: expected <index>\\t<symbol>",
                path.display(),
                line_no + 1
            ))
        })?;
        let index = index.parse::<usize>().map_err(|err| {
            BpeError::Serialization(format!(
                "{}:{}: invalid index {index:?}: {err}",
                path.display(),
                line_no + 1
            ))
        })?;
        records.push((index, symbol.to_owned()));
    }
    Ok(records)
}

/// Writes merges as `left right\n` lines in application order.
pub fn write_merges<'a, W, I>(writer: &mut W, merges: I) -> std::io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    for (left, right) in merges {
        writeln!(writer, "{left} {right}")?;
    }
    Ok(())
}

/// Writes the merge list to `path`.
pub fn save_merges<'a, P, I>(path: P, merges: I) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let path = path.as_ref();
    let io_err = |err| BpeError::io(err, Some(path.to_path_buf()));
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    write_merges(&mut writer, merges).map_err(io_err)?;
    writer.flush().map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainerConfig;
    use crate::symbols::SymbolTable;
    use crate::table::VocabTable;
    use crate::vocab::VocabOrder;
    use tempfile::tempdir;

    fn vocabulary(corpus: &str) -> Vocabulary {
        let cfg = TrainerConfig::builder()
            .start_marker(None::<String>)
            .show_progress(false)
            .build()
            .unwrap();
        let mut symbols = SymbolTable::new();
        let table = VocabTable::from_corpus(corpus, &cfg, &mut symbols).unwrap();
        Vocabulary::extract(&table, &symbols, VocabOrder::Lexicographic)
    }

    #[test]
    fn records_are_tab_separated() {
        let mut out = Vec::new();
        write_vocab_tsv(&mut out, &vocabulary("ab"), None).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0\t</w>\n1\ta\n2\tb\n");
    }

    #[test]
    fn strip_policy_removes_marker() {
        let mut out = Vec::new();
        write_vocab_tsv(&mut out, &vocabulary("ab"), Some("</w>")).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0\t\n1\ta\n2\tb\n");
    }

    #[test]
    fn empty_vocabulary_writes_empty_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("vocab.txt");
        save_vocab_tsv(&path, &vocabulary(""), None).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
        assert!(read_vocab_tsv(&path).unwrap().is_empty());
    }

    #[test]
    fn saved_vocabulary_reads_back() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("vocab.txt");
        save_vocab_tsv(&path, &vocabulary("ba"), None).unwrap();
        let records = read_vocab_tsv(&path).unwrap();
        assert_eq!(
            records,
            vec![(0, "</w>".into()), (1, "a".into()), (2, "b".into())]
        );
    }

    #[test]
    fn malformed_line_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("vocab.txt");
        std::fs::write(&path, "0\ta\nnot-a-record\n").unwrap();
        let err = read_vocab_tsv(&path).expect_err("malformed input must fail");
        assert!(matches!(err, BpeError::Serialization(message) if message.contains(":2:")));
    }

    #[test]
    fn merges_are_written_in_order() {
        let mut out = Vec::new();
        write_merges(&mut out, [("a", "b"), ("ab", "</w>")]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a b\nab </w>\n");
    }
}
