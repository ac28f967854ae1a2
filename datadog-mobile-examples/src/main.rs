use std::{collections::HashMap, sync::Arc, thread, time::Duration};

use datadog_mobile::{
    ActionType, AttributeValue, Config, ErrorSource, EventRecord, Sink, TelemetryFacade, UserInfo,
};

/// Prints every record as one JSON line, standing in for the native
/// Datadog SDK that a real host application would plug in.
struct StdoutSink;

impl Sink for StdoutSink {
    fn emit(&self, record: EventRecord) {
        match serde_json::to_string(&record) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("failed to serialize record: {e}"),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let facade = TelemetryFacade::new(Arc::new(StdoutSink));

    let mut config = Config::builder();
    config
        .set_client_token("pub0123456789".to_string())
        .set_env("development".to_string())
        .set_application_id("shop-app-id".to_string())
        .set_service("shop-app".to_string())
        .add_first_party_host("api.shop.example".to_string());
    facade.initialize(config.build())?;

    facade.set_user(UserInfo {
        id: Some("user-42".to_string()),
        name: Some("Jo Doe".to_string()),
        email: None,
        extra_info: HashMap::new(),
    });

    let logger = facade.logger("app")?;
    logger.info("application started");

    // A user opens the cart screen...
    facade.start_view("cart", "CartScreen", HashMap::new())?;
    facade.add_action(ActionType::Tap, "open_cart", HashMap::new())?;

    // ...which fetches the cart over the network, traced end to end.
    let mut span = facade.start_span("fetch_cart")?;
    let mut headers: HashMap<String, String> = HashMap::new();
    if facade.should_trace_host("api.shop.example") {
        facade.inject(span.context(), &mut headers)?;
    }
    println!("# outgoing headers: {headers:?}");

    facade.start_resource("cart-fetch", "GET", "https://api.shop.example/cart", HashMap::new())?;
    thread::sleep(Duration::from_millis(20));
    facade.stop_resource("cart-fetch", 200, 1024)?;
    span.set_tag("cart.items", 3_i64)?;
    span.finish()?;

    facade.add_view_timing("cart_loaded")?;

    // Simulate a rendering failure on one item
    facade.add_error(
        "thumbnail decode failed",
        ErrorSource::Source,
        None,
        HashMap::from([("item.id".to_string(), AttributeValue::from("sku-9"))]),
    )?;

    facade.stop_view("cart", HashMap::new())?;
    logger.info("demo finished");

    Ok(())
}
