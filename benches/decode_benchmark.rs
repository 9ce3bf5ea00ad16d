use criterion::{black_box, criterion_group, criterion_main, Criterion};
use map_viewer::projection::lon_lat_to_web_mercator;
use map_viewer::{decode_with_fallback, VectorFormat};
use nalgebra::Point2;

fn track_geojson(points: usize) -> String {
    let coordinates = (0..points)
        .map(|i| {
            let t = i as f64 / points as f64;
            format!("[{:.6}, {:.6}]", 138.0 + t, 35.0 + (t * 10.0).sin() * 0.1)
        })
        .collect::<Vec<_>>()
        .join(",");
    format!(
        r#"{{ "type": "Feature", "properties": {{ "name": "track" }}, "geometry": {{ "type": "LineString", "coordinates": [{}] }} }}"#,
        coordinates
    )
}

fn track_gpx(points: usize) -> String {
    let points = (0..points)
        .map(|i| {
            let t = i as f64 / points as f64;
            format!(r#"<trkpt lat="{:.6}" lon="{:.6}"/>"#, 35.0 + t * 0.1, 138.0 + t)
        })
        .collect::<String>();
    format!(r#"<gpx version="1.1"><trk><name>track</name><trkseg>{}</trkseg></trk></gpx>"#, points)
}

fn decode_benchmark(c: &mut Criterion) {
    let geojson = track_geojson(10_000);
    let gpx = track_gpx(10_000);
    let all_formats = VectorFormat::candidates_for_extension("");

    c.bench_function("geojson_direct", |b| {
        b.iter(|| decode_with_fallback(black_box(&geojson), &[VectorFormat::GeoJson]))
    });

    // GPX is tried after GeoJSON fails
    c.bench_function("gpx_with_fallback", |b| {
        b.iter(|| decode_with_fallback(black_box(&gpx), &all_formats))
    });

    c.bench_function("project_to_web_mercator", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for i in 0..10_000 {
                let point = lon_lat_to_web_mercator(black_box(Point2::new(138.0 + i as f64 * 1e-4, 35.0)));
                sum += point.x;
            }
            sum
        })
    });
}

criterion_group!(benches, decode_benchmark);
criterion_main!(benches);
