use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sunoloader::extractor::identifier::{find_all, Identifier};
use sunoloader::extractor::playlist::playlist_from_dom;
use sunoloader::extractor::rendered::fields_from_dom;
use sunoloader::extractor::static_fields::extract_fields;
use sunoloader::utils::{decode_html_entities, ExtractorSettings};

const SONG_ID: &str = "0f1e2d3c-4b5a-4697-8877-665544332211";
const PLAYLIST_ID: &str = "11111111-2222-4333-8444-555555555555";

/// A song page padded with the kind of script noise real pages carry
fn song_fixture(padding: usize) -> String {
    let noise = r#"<script>self.__next_f.push([1,"a:[\"$\",\"div\",null,{}]"])</script>"#.repeat(padding);
    format!(
        r#"<html><head>
        <meta property="og:title" content="Midnight Drive | Suno">
        <meta property="og:description" content="A song by @coolartist">
        <meta property="og:image" content="https://cdn2.suno.ai/image_large.jpeg">
        <script type="application/json" id="__NEXT_DATA__">{{"props":{{"pageProps":{{"clip":{{"id":"{SONG_ID}","title":"Midnight Drive","metadata":{{"tags":"synthwave, dreamy","prompt":""}}}}}}}}}}</script>
        </head><body>{noise}
        <h1>Midnight Drive</h1>
        <a href="/@coolartist">@coolartist</a>
        <div><a href="/style/synthwave">synthwave</a><a href="/style/dreamy">dreamy</a></div>
        <div><p>A late night ride &amp;amp; neon streets.</p><button>Show more</button></div>
        </body></html>"#
    )
}

fn playlist_fixture(members: usize) -> String {
    let anchors: String = (0..members)
        .map(|n| format!(r#"<a href="/song/{:08x}-0000-4000-8000-{:012x}">track {n}</a>"#, n, n))
        .collect();
    format!(
        r#"<html><body><h1>Long Playlist</h1><a href="/@curator">curator</a>{anchors}</body></html>"#
    )
}

fn benchmark_static_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("Static Extraction");
    let settings = ExtractorSettings::default();
    let id = Identifier::parse(SONG_ID).unwrap();

    for padding in [0usize, 50, 500] {
        let html = song_fixture(padding);
        group.bench_with_input(
            BenchmarkId::new("extract_fields", format!("{}KB", html.len() / 1024)),
            &html,
            |b, html| b.iter(|| extract_fields(black_box(html), &id, &settings)),
        );
    }

    group.finish();
}

fn benchmark_rendered_dom(c: &mut Criterion) {
    let settings = ExtractorSettings::default();
    let id = Identifier::parse(SONG_ID).unwrap();
    let html = song_fixture(50);

    c.bench_function("fields_from_dom", |b| {
        b.iter(|| fields_from_dom(black_box(&html), &id, &settings))
    });
}

fn benchmark_playlist_members(c: &mut Criterion) {
    let mut group = c.benchmark_group("Playlist Members");
    let settings = ExtractorSettings::default();
    let playlist = Identifier::parse(PLAYLIST_ID).unwrap();

    for members in [10usize, 100, 1000] {
        let html = playlist_fixture(members);
        group.bench_with_input(BenchmarkId::new("anchors", members), &html, |b, html| {
            b.iter(|| playlist_from_dom(black_box(html), &playlist, &settings))
        });
        group.bench_with_input(BenchmarkId::new("text_scan", members), &html, |b, html| {
            b.iter(|| find_all(black_box(html)))
        });
    }

    group.finish();
}

fn benchmark_entity_decoding(c: &mut Criterion) {
    let text = "Rock &amp;amp; Roll &#39;n&#x27; &quot;Blues&quot; &hellip; ".repeat(100);
    c.bench_function("decode_html_entities", |b| {
        b.iter(|| decode_html_entities(black_box(&text)))
    });
}

criterion_group!(
    benches,
    benchmark_static_extraction,
    benchmark_rendered_dom,
    benchmark_playlist_members,
    benchmark_entity_decoding
);
criterion_main!(benches);
