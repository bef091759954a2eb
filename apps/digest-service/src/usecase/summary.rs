//! # ダイジェスト HTML レンダラー
//!
//! tera テンプレートエンジンで掲示板アクティビティの HTML 断片を生成する。
//! 生成した断片は `board-summary` イベントの変数としてプロバイダに渡され、
//! プロバイダ側テンプレートに埋め込まれる。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに
//!   埋め込まれる

use ekklesia_domain::digest::BoardActivity;
use tera::{Context, Tera};

use crate::error::DigestError;

/// ダイジェスト HTML レンダラー
///
/// tera テンプレートエンジンをラップし、掲示板アクティビティのリストから
/// HTML 断片を生成する。
pub struct SummaryRenderer {
    engine: Tera,
}

impl SummaryRenderer {
    /// 新しいレンダラーインスタンスを作成
    ///
    /// `include_str!` で埋め込んだテンプレートを tera に登録する。
    pub fn new() -> Result<Self, DigestError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![(
                "board_summary.html",
                include_str!("../../templates/digest/board_summary.html"),
            )])
            .map_err(|e| DigestError::Template(e.to_string()))?;

        Ok(Self { engine })
    }

    /// アクティビティのある掲示板リストから HTML 断片を生成する
    ///
    /// # 引数
    ///
    /// - `member_name`: メンバーの表示名
    /// - `boards`: アクティビティのある掲示板（空でないこと）
    /// - `view_url`: 掲示板一覧へのリンク URL
    pub fn render(
        &self,
        member_name: &str,
        boards: &[BoardActivity],
        view_url: &str,
    ) -> Result<String, DigestError> {
        let mut context = Context::new();
        context.insert("member_name", member_name);
        context.insert("boards", boards);
        context.insert("view_url", view_url);

        self.engine
            .render("board_summary.html", &context)
            .map_err(|e| DigestError::Template(e.to_string()))
    }
}
