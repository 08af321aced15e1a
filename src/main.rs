mod assistant;
mod config;
mod supervisor;

use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;

use assistant::{
    ContentRepository, DeliveryRouter, Interaction, Messenger, ReferenceDataset, TelegramClient,
    interaction_from_callback, interaction_from_message,
};
use config::{Config, EnvOverrides};
use supervisor::state::StateStore;
use supervisor::{ShutdownSignal, Supervisor, SupervisorConfig};

struct BotState {
    router: DeliveryRouter,
    bot_username: Option<String>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "villagebot.json".to_string());
    let config = match Config::load(&config_path, EnvOverrides::from_env()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let (file_writer, log_guard) = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("villagebot.log"))
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            (Some(non_blocking), Some(guard))
        }
        Err(e) => {
            eprintln!("Failed to open log file, logging to stdout only: {e}");
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                )
        }))
        .init();

    info!("🚀 Starting villagebot...");
    info!("Loaded config from {config_path}");

    let bot = Bot::new(&config.telegram_bot_token);
    let telegram: Arc<dyn Messenger> = Arc::new(TelegramClient::new(bot.clone()));

    let bot_username = match config.bot_username.clone() {
        Some(username) => Some(username),
        None => match telegram.ping().await {
            Ok(username) => {
                info!("Bot username: @{username}");
                Some(username)
            }
            Err(e) => {
                warn!("Failed to get bot info: {e}");
                None
            }
        },
    };

    let dataset = ReferenceDataset::load_or_empty(&config.data_file);
    let content = Arc::new(ContentRepository::new(dataset, bot_username.clone()));
    let router = DeliveryRouter::new(content, telegram.clone(), config.trigger_words.clone());
    let state = Arc::new(BotState { router, bot_username });

    let supervisor = Arc::new(Supervisor::new(
        StateStore::new(config.state_file()),
        telegram,
        config.operator_chat_id,
        SupervisorConfig::default(),
    ));
    supervisor.startup().await;
    if let Err(e) = supervisor.install_signal_handlers() {
        error!("{e}");
    }

    if config.health_check_interval_secs > 0 {
        let supervisor = Arc::clone(&supervisor);
        let period = Duration::from_secs(config.health_check_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                if supervisor.is_shutting_down() {
                    break;
                }
                supervisor.health_check().await;
            }
        });
    }

    let exit = supervisor
        .run(|shutdown| run_dispatcher(bot.clone(), Arc::clone(&state), shutdown))
        .await;

    info!("👋 Stopped ({:?})", exit);
    // process::exit skips destructors; flush the log writer first.
    drop(log_guard);
    std::process::exit(exit.code());
}

/// One run of the Telegram dispatcher. Returns once the shutdown signal fires.
async fn run_dispatcher(
    bot: Bot,
    state: Arc<BotState>,
    mut shutdown: ShutdownSignal,
) -> Result<(), String> {
    let me = bot
        .get_me()
        .await
        .map_err(|e| format!("Failed to reach Telegram: {e}"))?;
    info!("🤖 Connected as @{}", me.username());

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|_| async {})
        .build();

    let token = dispatcher.shutdown_token();
    let stopper = tokio::spawn(async move {
        shutdown.requested().await;
        // The token refuses while the dispatcher is still starting up.
        loop {
            match token.shutdown() {
                Ok(done) => {
                    done.await;
                    break;
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
    });

    dispatcher.dispatch().await;
    stopper.abort();
    Ok(())
}

async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if let Some(interaction) = interaction_from_message(&msg, state.bot_username.as_deref()) {
        route(&state, interaction).await;
    }
    Ok(())
}

async fn handle_callback(query: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    if let Some(interaction) = interaction_from_callback(&query) {
        route(&state, interaction).await;
    }
    Ok(())
}

async fn route(state: &BotState, interaction: Interaction) {
    match state.router.handle(&interaction).await {
        Ok(outcome) => debug!(
            "{:?} from {} ({:?}) → {:?}",
            interaction.request, interaction.user_name, interaction.context, outcome
        ),
        Err(e) => warn!(
            "Failed to answer {} in chat {}: {e}",
            interaction.user_name, interaction.chat_id
        ),
    }
}
