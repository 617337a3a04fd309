use crate::DomainError;
use std::path::Path;

/// アプリケーションバンドルの拡張子
pub const APP_SUFFIX: &str = ".app";

/// 識別子の入力揺れを吸収して正規化する
/// - 前後の空白と `"` を除去
/// - 末尾の `/` を除去（バンドルはディレクトリとして渡されることがある）
///
/// 大文字小文字は保持する（完全一致検索でファイル名として使うため）。
pub fn normalize_identifier<S: Into<String>>(raw: S) -> String {
    let raw: String = raw.into();
    raw.trim()
        .trim_matches('"')
        .trim_end_matches(['/', '\\'])
        .to_string()
}

/// 識別子として受け付けられるか検証する。
pub fn validate_identifier(identifier: &str) -> Result<(), DomainError> {
    if identifier.is_empty() {
        return Err(DomainError::ValidationError(
            "識別子を空にすることはできません".into(),
        ));
    }
    if identifier.contains('\0') {
        return Err(DomainError::ValidationError(
            "識別子にNUL文字を含めることはできません".into(),
        ));
    }
    if identifier.contains('/') || identifier.contains('\\') {
        return Err(DomainError::ValidationError(format!(
            "識別子 '{}' にパス区切り文字を含めることはできません",
            identifier
        )));
    }
    if identifier == "." || identifier == ".." {
        return Err(DomainError::ValidationError(format!(
            "識別子 '{}' は無効です",
            identifier
        )));
    }
    Ok(())
}

/// 比較用の語幹: 小文字化し、末尾のアプリ拡張子を取り除く。
pub fn app_stem(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.strip_suffix(APP_SUFFIX) {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}

/// アプリ拡張子を持つか（大文字小文字は区別しない）
pub fn has_app_suffix(name: &str) -> bool {
    name.to_lowercase().ends_with(APP_SUFFIX)
}

/// 実行ファイルのパスから識別子を導出する。
///
/// `<名前>.app/Contents/MacOS/<実行ファイル>` の形ならそのバンドル名を返す。
/// バンドル内の他の場所にあるヘルパー（`Contents/Frameworks/...` など）は
/// 外側のアプリとはみなさず、ファイル名をそのまま使う。
pub fn identifier_from_executable_path(path: &Path) -> Option<String> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())?;
    let bundle = path
        .parent()
        .filter(|dir| dir.file_name().and_then(|n| n.to_str()) == Some("MacOS"))
        .and_then(Path::parent)
        .filter(|dir| dir.file_name().and_then(|n| n.to_str()) == Some("Contents"))
        .and_then(Path::parent)
        .and_then(|dir| dir.file_name())
        .and_then(|n| n.to_str())
        .filter(|name| has_app_suffix(name));
    Some(bundle.unwrap_or(file_name).to_string())
}
