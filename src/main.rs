use anyhow::Result;
use dialoguer::Input;
use moonbid::{
    auction::{HttpAuctionApi, HttpScanFormatter},
    bidder::{BidContext, Bidder, BidderDeps, Trigger},
    config::ConfigLoader,
    console::{ConsoleCommand, HELP},
    logging::init_logger,
    market::{HttpItemNameSource, HttpPriceSource, PriceOracle},
    materials::MaterialReference,
    notify::{format_threshold, FanoutNotifier, LogNotifier, Notifier, WebhookNotifier},
    report::build_report,
    store::JsonFileBidStore,
    utils::format_number_with_separators,
    valuation::hours_remaining,
};
use std::sync::Arc;
use tracing::{error, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const TOKEN_ENV: &str = "MOONBID_TOKEN";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let _log_guard = init_logger()?;
    info!("Starting Moonbid v{}", VERSION);

    // Load or create configuration
    let config_loader = Arc::new(ConfigLoader::new());
    let config = config_loader.load()?;
    let base_dir = config_loader.base_dir();

    let materials_path = config.resolve(&base_dir, &config.materials_path);
    let reference = Arc::new(MaterialReference::load(&materials_path)?);
    if reference.is_empty() {
        warn!("Material reference {:?} is empty, no moon can be valued", materials_path);
    }

    // The token is never written to disk
    let token = match std::env::var(TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => Some(token),
        _ => {
            let token: String = Input::new()
                .with_prompt("Enter the auction site bearer token (empty to set it later with /token)")
                .allow_empty(true)
                .interact_text()?;
            Some(token)
        }
    };

    let mut notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier)];
    if let Some(url) = config.active_webhook_url() {
        info!("Webhook notifications enabled");
        notifiers.push(Arc::new(WebhookNotifier::new(url)));
    }

    let price_source = Arc::new(HttpPriceSource::new(
        config.market_api_url.clone(),
        config.trade_hub_location_id,
    )?);
    let oracle = Arc::new(PriceOracle::new(price_source.clone()));
    // Reports get their own cache so they never evict the bidder's quotes
    let report_oracle = PriceOracle::new(price_source);
    let names = HttpItemNameSource::new(config.item_name_api_url.clone())?;

    let deps = BidderDeps {
        auctions: Arc::new(HttpAuctionApi::new(config.auction_api_url.clone(), config.page_size)?),
        formatter: Arc::new(HttpScanFormatter::new(config.format_api_url.clone())?),
        oracle,
        reference: reference.clone(),
        bids: Arc::new(JsonFileBidStore::open(config.resolve(&base_dir, &config.bids_path))),
        settings: config_loader.clone(),
        notifier: Arc::new(FanoutNotifier::new(notifiers)),
    };

    let rules = config.rule_book();
    info!("{} threshold rules, {} excluded items", rules.rules.len(), rules.exclusions.len());

    let bidder = Arc::new(Bidder::new(deps, BidContext::new(token, rules), config.timings()));
    let mut loop_task = tokio::spawn(bidder.clone().run());

    // Set up console input handler for commands
    info!("Console interface ready - type commands and press Enter:");
    for line in HELP {
        info!("{}", line);
    }

    let bidder_for_console = bidder.clone();
    let report_min_buy = config.report_min_buy;
    tokio::spawn(async move {
        use tokio::io::stdin;
        use tokio::io::{AsyncBufReadExt, BufReader};

        let reader = BufReader::new(stdin());
        let mut lines = reader.lines();
        let bidder = bidder_for_console;

        while let Ok(Some(line)) = lines.next_line().await {
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            let command = match ConsoleCommand::parse(input) {
                Ok(command) => command,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };

            match command {
                ConsoleCommand::SetToken(token) => bidder.set_token(&token),
                ConsoleCommand::AddRule(rule) => match bidder.add_rule(rule) {
                    Ok(()) => info!("Added rule {}", rule),
                    Err(e) => error!("Failed to save rule: {}", e),
                },
                ConsoleCommand::RemoveRule(n) => match bidder.remove_rule(n - 1) {
                    Ok(Some(rule)) => info!("Removed rule {}", rule),
                    Ok(None) => warn!("No rule {}", n),
                    Err(e) => error!("Failed to save rules: {}", e),
                },
                ConsoleCommand::ListRules => {
                    let book = bidder.rules();
                    if book.rules.is_empty() {
                        info!("No rules; nothing will be bid on");
                    }
                    for (i, rule) in book.rules.iter().enumerate() {
                        info!("  {}. {}", i + 1, rule);
                    }
                    for name in &book.exclusions {
                        info!("  excluded: {}", name);
                    }
                }
                ConsoleCommand::Exclude(name) => match bidder.exclude(&name) {
                    Ok(true) => info!("Excluded {}", name),
                    Ok(false) => info!("{} was already excluded", name),
                    Err(e) => error!("Failed to save exclusions: {}", e),
                },
                ConsoleCommand::Include(name) => match bidder.include(&name) {
                    Ok(true) => info!("Included {}", name),
                    Ok(false) => info!("{} was not excluded", name),
                    Err(e) => error!("Failed to save exclusions: {}", e),
                },
                ConsoleCommand::Refresh => bidder.request_refresh(Trigger::Manual),
                ConsoleCommand::Status => {
                    info!("State: {:?}", bidder.state().get());
                    for valued in bidder.last_valued() {
                        let c = valued.computed;
                        info!(
                            "  [{}] {} ({} / {}) cost index {:.2} / {}, next bid {} ISK, ~{}h left",
                            valued.record.id,
                            valued.record.item_name,
                            valued.record.region,
                            valued.record.category,
                            c.cost_index,
                            format_threshold(c.matched_threshold),
                            format_number_with_separators(c.next_bid_price),
                            hours_remaining(c.hours_since_start)
                        );
                    }
                }
                ConsoleCommand::Report(path) => {
                    let text = match tokio::fs::read_to_string(&path).await {
                        Ok(text) => text,
                        Err(e) => {
                            error!("Failed to read {:?}: {}", path, e);
                            continue;
                        }
                    };
                    match build_report(&text, &reference, &report_oracle, Some(&names), report_min_buy).await {
                        Ok(entries) => {
                            for entry in entries {
                                info!("\n{}", entry.render());
                            }
                        }
                        Err(e) => error!("Report failed: {}", e),
                    }
                }
                ConsoleCommand::Help => {
                    for line in HELP {
                        info!("{}", line);
                    }
                }
                ConsoleCommand::Quit => {
                    bidder.dispose();
                    break;
                }
            }
        }
    });

    info!("Moonbid is now running. Type commands below or press Ctrl+C to exit.");

    tokio::select! {
        result = &mut loop_task => {
            if let Err(e) = result {
                error!("Bidding loop crashed: {}", e);
            }
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received");
            bidder.dispose();
        }
    }

    if let Err(e) = loop_task.await {
        error!("Bidding loop crashed: {}", e);
    }
    Ok(())
}
