//! Shared fixtures: a scripted local HTTP server and a gzip product feed

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use rusqlite::Connection;
use skuload_core::{HttpConfig, ProgressContext};
use skuload_products::Config;

pub const HEADER: &str = "product_id,sku_id,product_name,seller_name,brand_name,\
venture_category1_name_en,venture_category2_name_en,venture_category3_name_en,\
venture_category_name_local,availability,platform_commission_rate,promotion_price,\
current_price,product_commission_rate,seller_rating,bonus_commission_rate,\
discount_percentage,rating_avg_value,price,number_of_reviews";

pub fn row(pid: usize, price: &str) -> String {
    format!(
        "{pid},SKU{pid},Product {pid}, Seller\t{pid} , Brand {pid} ,Fashion,,Shoes,รองเท้า,,\
         0.05,9.5,10,0.1,4.5,,15,4.2,{price},12.0\n"
    )
}

/// 150 rows: batch 1 (rows 1-100) repeats 3 keys, batch 2 has one bad price.
pub fn feed() -> String {
    let mut csv = format!("{HEADER}\n");
    for pid in 1..=97 {
        csv.push_str(&row(pid, "19.99"));
    }
    for pid in [5, 10, 15] {
        csv.push_str(&row(pid, "1.00"));
    }
    for pid in 98..=147 {
        let price = if pid == 120 { "not-a-price" } else { "19.99" };
        csv.push_str(&row(pid, price));
    }
    csv
}

pub fn gzip(text: &str) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(text.as_bytes()).unwrap();
    enc.finish().unwrap()
}

pub fn read_request(stream: &mut std::net::TcpStream) {
    let mut buf = [0u8; 4096];
    let mut seen = Vec::new();
    while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => seen.extend_from_slice(&buf[..n]),
        }
    }
}

/// Serve `script` in order, one response per connection.
pub fn scripted_server(script: Vec<(u16, Vec<u8>)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    thread::spawn(move || {
        for (status, body) in script {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            read_request(&mut stream);
            counter.fetch_add(1, Ordering::SeqCst);
            let head = format!(
                "HTTP/1.1 {status} Scripted\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
            let _ = stream.flush();
        }
    });
    (format!("http://{addr}/products.csv.gz"), hits)
}

pub fn config(url: String, db: &Path) -> Config {
    Config {
        url,
        db_path: db.to_path_buf(),
        chunk_size: 100,
        workers: 4,
        queue_capacity: 2,
        http: HttpConfig {
            backoff_base: Duration::from_millis(5),
            system_proxy: false,
            ..HttpConfig::default()
        },
        ..Config::default()
    }
}

pub fn quiet() -> ProgressContext {
    ProgressContext::with_tty(false)
}

pub fn count(db: &Path) -> i64 {
    Connection::open(db)
        .unwrap()
        .query_row("SELECT COUNT(*) FROM products", [], |r| r.get(0))
        .unwrap()
}
