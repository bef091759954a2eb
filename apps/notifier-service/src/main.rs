//! # Notifier Service サーバー
//!
//! ビジネスイベント（献金、参加申請、祈祷課題など）を受け取り、
//! 配信ルールに従って宛先を解決し、テンプレートメールを送信する
//! HTTP 関数。
//!
//! ## 役割
//!
//! - **宛先解決**: イベント種別 → 役職・リード検索による受信者導出
//! - **テンプレート配信**: プロバイダ側でホストされるテンプレートへの
//!   変数渡しと送信委譲
//! - **テストモード**: 管理者が任意の宛先にテンプレートを検証送信
//!
//! ## 呼び出し元
//!
//! 業務イベントを発生させたアプリケーションコード（献金登録、参加申請の
//! 受付など）と、Digest Batcher（`board-summary` イベント）。
//! 呼び出し元は fire-and-forget であり、通知の失敗が業務処理を
//! 失敗させることはない。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `NOTIFIER_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `NOTIFIER_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `REDIS_URL` | **Yes** | Redis 接続 URL（トークン検証用） |
//! | `DELIVERY_BACKEND` | No | `provider` \| `noop`（デフォルト: `noop`） |
//! | `DELIVERY_PROVIDER_URL` | No | プロバイダ API のベース URL |
//! | `DELIVERY_PROVIDER_API_KEY` | No | プロバイダ API キー |
//! | `DELIVERY_FROM_ADDRESS` | No | 送信元メールアドレス |
//!
//! ## 起動方法
//!
//! ```bash
//! NOTIFIER_PORT=3100 DATABASE_URL=postgres://... REDIS_URL=redis://... \
//!     cargo run -p ekklesia-notifier-service
//! ```

mod config;
mod error;
mod handler;
mod usecase;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use config::NotifierConfig;
use ekklesia_infra::{
    DeliverySender,
    db,
    delivery::{HttpDeliverySender, NoopDeliverySender},
    identity::{RedisTokenVerifier, create_connection_manager},
    repository::{PostgresDeliveryLogRepository, PostgresMemberRepository},
};
use ekklesia_shared::observability::{TracingConfig, init_subscriber};
use handler::{NotifierState, dispatch_event, health_check};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use usecase::DispatchUseCaseImpl;

/// Notifier Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    init_subscriber(&TracingConfig::from_env("notifier-service"));

    // 設定読み込み
    let config = NotifierConfig::from_env().expect("設定の読み込みに失敗しました");

    tracing::info!(
        "Notifier Service を起動します: {}:{}",
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

    // Redis 接続（テストモードのトークン検証用）
    let redis_conn = create_connection_manager(&config.redis_url)
        .await
        .expect("Redis 接続に失敗しました");

    // 配信バックエンドを環境変数で選択
    let sender: Arc<dyn DeliverySender> = match config.delivery.backend.as_str() {
        "provider" => Arc::new(HttpDeliverySender::new(
            &config.delivery.provider_url,
            config.delivery.provider_api_key.clone(),
        )),
        "noop" => Arc::new(NoopDeliverySender),
        other => {
            tracing::warn!(
                backend = other,
                "未知の DELIVERY_BACKEND のため noop を使用します"
            );
            Arc::new(NoopDeliverySender)
        }
    };

    // 依存コンポーネントを初期化
    let member_repo = PostgresMemberRepository::new(pool.clone());
    let token_verifier = RedisTokenVerifier::new(redis_conn);
    let delivery_log_repo = Arc::new(PostgresDeliveryLogRepository::new(pool.clone()));
    let usecase = DispatchUseCaseImpl::new(
        member_repo,
        token_verifier,
        sender,
        delivery_log_repo,
        config.delivery.from_address.clone(),
    );
    let state = Arc::new(NotifierState { usecase });

    // ルーター構築
    // CORS はプリフライト（OPTIONS）に 200 + 許可ヘッダで応答する
    let app = Router::new()
        .route(
            "/",
            post(dispatch_event::<PostgresMemberRepository, RedisTokenVerifier>),
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
    tracing::info!("Notifier Service が起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
