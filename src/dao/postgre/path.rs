use std::path::PathBuf;

/// Location of a bootstrap SQL file, `<dir>/migration/postgresql/<file>`.
pub fn get_path(dir: &str, file: &str) -> PathBuf {
    let mut buf = PathBuf::new();

    for chunk in [dir, "migration", "postgresql", file] {
        buf.push(chunk);
    }

    buf
}
