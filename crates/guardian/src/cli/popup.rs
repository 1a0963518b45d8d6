use guardian_core::config::Config;
use guardian_core::extract::PageDocument;
use guardian_core::presenter::{Presenter, View};
use guardian_core::protocol::TabId;

pub fn run(config: &Config, tab: Option<u32>, rerun: Option<&str>, url: Option<&str>, json: bool) -> i32 {
    let tab = tab.map(TabId);

    let presenter = match (rerun, url) {
        (Some(file), Some(url)) => {
            let html = match super::read_html(file) {
                Ok(h) => h,
                Err(e) => {
                    eprintln!("guardian: {e}");
                    return 1;
                }
            };
            let coordinator = match super::open_coordinator(config) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("guardian: {e}");
                    return 1;
                }
            };
            let mut presenter = Presenter::open(coordinator.store(), tab);
            presenter.rerun(&coordinator, &PageDocument::new(url, html));
            presenter
        }
        _ => match super::open_store(config) {
            Ok(store) => Presenter::open(&store, tab),
            Err(e) => {
                tracing::warn!("{e}");
                Presenter::empty()
            }
        },
    };

    if json {
        let value = match presenter.view() {
            View::Verdict(v) => serde_json::to_value(v).unwrap_or(serde_json::Value::Null),
            View::NoData => serde_json::Value::Null,
        };
        println!("{value}");
    } else {
        print!("{}", presenter.render());
    }
    0
}
