//! # Digest Service サーバー
//!
//! リンク済みアカウントを持つメンバーをページ単位で走査し、掲示板の
//! 未読アクティビティを集計して、アクティビティのあるメンバーに
//! ダイジェスト通知を発火させる HTTP 関数（Digest Batcher）。
//!
//! ## 役割
//!
//! - **ページング**: メンバー ID 順に 1 ページ 10 件ずつ処理
//! - **アクティビティ集計**: メンバー × 掲示板ごとにウォーターマーク以降
//!   （最大 24 時間）のメッセージ・返信・スレッドを数える
//! - **ダイジェスト発火**: Notifier Service に `board-summary` イベントを送信
//! - **トランポリン**: フルページ処理後、自己 HTTP 呼び出しで次ページへ継続
//!
//! ## 呼び出し元
//!
//! スケジュールトリガー（cron）。カーソル付きの呼び出しは自分自身の
//! トランポリンのみが行う。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `DIGEST_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `DIGEST_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `NOTIFIER_URL` | **Yes** | Notifier Service のベース URL |
//! | `DIGEST_SELF_URL` | No | 自己呼び出し先 URL（デフォルト: localhost） |
//! | `DIGEST_VIEW_BASE_URL` | No | メール内リンクのベース URL |
//!
//! ## 起動方法
//!
//! ```bash
//! DIGEST_PORT=3101 DATABASE_URL=postgres://... NOTIFIER_URL=http://localhost:3100 \
//!     cargo run -p ekklesia-digest-service
//! ```

mod client;
mod config;
mod error;
mod handler;
mod usecase;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use client::{HttpBatchInvoker, HttpNotifierClient};
use config::DigestConfig;
use ekklesia_domain::clock::SystemClock;
use ekklesia_infra::{
    authz::PostgresBoardAccessChecker,
    db,
    repository::{
        PostgresBoardRepository,
        PostgresMemberRepository,
        PostgresWatermarkRepository,
    },
};
use ekklesia_shared::observability::{TracingConfig, init_subscriber};
use handler::{DigestState, health_check, run_batch};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use usecase::{DigestBatchUseCaseImpl, SummaryRenderer};

/// Digest Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    init_subscriber(&TracingConfig::from_env("digest-service"));

    // 設定読み込み
    let config = DigestConfig::from_env().expect("設定の読み込みに失敗しました");

    tracing::info!(
        "Digest Service を起動します: {}:{}",
        config.host,
        config.port
    );

    // データベース接続プールを作成
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("データベース接続に失敗しました");
    db::run_migrations(&pool)
        .await
        .expect("マイグレーションの適用に失敗しました");
    tracing::info!("データベースに接続しました");

    // 依存コンポーネントを初期化
    let member_repo = PostgresMemberRepository::new(pool.clone());
    let board_repo = PostgresBoardRepository::new(pool.clone());
    let watermark_repo = PostgresWatermarkRepository::new(pool.clone());
    let access_checker = Arc::new(PostgresBoardAccessChecker::new(pool.clone()));
    let notifier_client = Arc::new(HttpNotifierClient::new(&config.notifier_url));
    let invoker = Arc::new(HttpBatchInvoker::new(&config.self_url));
    let renderer = SummaryRenderer::new().expect("テンプレートの初期化に失敗しました");

    let usecase = DigestBatchUseCaseImpl::new(
        member_repo,
        board_repo,
        watermark_repo,
        access_checker,
        notifier_client,
        invoker,
        Arc::new(SystemClock),
        renderer,
        config.view_base_url.clone(),
    );
    let state = Arc::new(DigestState { usecase });

    // ルーター構築
    // CORS はプリフライト（OPTIONS）に 200 + 許可ヘッダで応答する
    let app = Router::new()
        .route(
            "/",
            post(
                run_batch::<
                    PostgresMemberRepository,
                    PostgresBoardRepository,
                    PostgresWatermarkRepository,
                >,
            ),
        )
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // サーバー起動
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("アドレスのパースに失敗しました");

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Digest Service が起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
