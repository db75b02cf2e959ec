//! Local HTTP fixtures for tests that exercise real fetches.

use std::io::Cursor;

use axum::Router;
use image::{DynamicImage, ImageFormat, RgbImage};

/// Serve `router` on an ephemeral localhost port; returns `http://127.0.0.1:PORT/`.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/", addr)
}

/// PNG bytes: left half `a`, right half `b`.
pub fn png_bytes(a: [u8; 3], b: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_fn(60, 40, |x, _| if x < 30 { image::Rgb(a) } else { image::Rgb(b) });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}
