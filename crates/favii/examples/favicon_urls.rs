//! Example: Resolve favicons for a few live sites
//!
//! Run with: cargo run -p favii --example favicon_urls
//!
//! Uses one cached client, so the second URL on a host is answered without
//! another request.

use favii::{Favii, PageMetaInfo};

/// Sites to look up
const URLS: &[&str] = &[
    "https://www.rust-lang.org/",
    "https://www.rust-lang.org/learn",
    "https://docs.rs/",
    "https://crates.io/",
    "https://example.com/",
];

#[tokio::main]
async fn main() {
    println!("Favii Favicon Examples");
    println!("======================\n");

    let favii = match Favii::new(true) {
        Ok(favii) => favii,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut failed = 0;

    for (i, url) in URLS.iter().enumerate() {
        println!("{}. {}", i + 1, url);

        match favii.get_page_info(url).await {
            Ok(info) => print_summary(&info),
            Err(e) => {
                println!("   Error: {}\n", e);
                failed += 1;
            }
        }
    }

    println!("======================");
    println!("{} of {} lookups failed", failed, URLS.len());

    if failed > 0 {
        std::process::exit(1);
    }
}

fn print_summary(info: &PageMetaInfo) {
    println!("   Fetched: {}", info.url());
    println!("   Metas: {}, Links: {}", info.metas().len(), info.links().len());

    if let Some(description) = info.meta_content("description") {
        let preview = description.chars().take(60).collect::<String>();
        println!(
            "   Description: {}{}",
            preview,
            if description.chars().count() > 60 { "..." } else { "" }
        );
    }

    println!("   Favicon: {}\n", info.favicon_url());
}
