use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use orgchart_renderer::avatar::{AvatarCoordinator, AvatarRequest};
use orgchart_renderer::config::{ChartConfig, LayoutConfig, RenderConfig};
use orgchart_renderer::document::{DocumentFormat, parse_document};
use orgchart_renderer::engine::{ChartContext, RunSignature, Traversal};
use orgchart_renderer::fonts::{FastTextMetrics, FontBook};
use orgchart_renderer::layout::compute_layout;
use orgchart_renderer::render::render_svg;
use orgchart_renderer::scene::Scene;
use orgchart_renderer::template::build_template;
use orgchart_renderer::theme::Palette;
use std::hint::black_box;

fn org_source(teams: usize, members: usize) -> String {
    let mut out = String::from("team: Company\nmanager:\n  name: CEO\n  alias: \"@ceo\"\nteams:\n");
    for t in 0..teams {
        out.push_str(&format!(
            "  - team: Team {t}\n    manager:\n      name: Lead {t}\n      alias: \"@lead{t}\"\n    members:\n"
        ));
        out.push_str("      - section: Engineers\n");
        for m in 0..members {
            out.push_str(&format!(
                "      - name: Person {t}-{m}\n        alias: \"@p{t}x{m}\"\n        meta: Engineer\n"
            ));
        }
    }
    out
}

fn build(input: &str, config: &ChartConfig, layout: &LayoutConfig) -> (Scene, FontBook) {
    let doc = parse_document(input, DocumentFormat::Yaml).expect("parse failed");
    let palette = Palette::from_colors(&config.color);
    let fonts = FontBook::load(&mut FastTextMetrics::new(), &config.text).expect("fonts");
    let mut scene = Scene::new();
    let template = build_template(&mut scene, config, &palette, &fonts, layout);
    let mut coordinator = AvatarCoordinator::new(config.avatar);
    let mut requests: Vec<AvatarRequest> = Vec::new();
    let ctx = ChartContext {
        config,
        palette: &palette,
        layout,
        template,
    };
    Traversal::new(
        &mut scene,
        ctx,
        RunSignature::from_value(1),
        &mut coordinator,
        &mut requests,
    )
    .run(&doc.root);
    black_box(requests.len());
    (scene, fonts)
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (teams, members) in [(2, 5), (10, 20), (40, 40)] {
        let input = org_source(teams, members);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{teams}x{members}")),
            &input,
            |b, data| {
                b.iter(|| {
                    let doc = parse_document(black_box(data), DocumentFormat::Yaml).expect("parse failed");
                    black_box(doc.root.is_structured());
                });
            },
        );
    }
    group.finish();
}

fn bench_traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("traversal");
    let config = ChartConfig::default();
    let layout = LayoutConfig::default();
    for (teams, members) in [(2, 5), (10, 20), (40, 40)] {
        let input = org_source(teams, members);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{teams}x{members}")),
            &input,
            |b, data| {
                b.iter(|| {
                    let (scene, _) = build(black_box(data), &config, &layout);
                    black_box(scene.len());
                });
            },
        );
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let config = ChartConfig::default();
    let layout = LayoutConfig::default();
    let render = RenderConfig::default();
    for (teams, members) in [(2, 5), (10, 20), (40, 40)] {
        let input = org_source(teams, members);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{teams}x{members}")),
            &input,
            |b, data| {
                b.iter(|| {
                    let (mut scene, fonts) = build(black_box(data), &config, &layout);
                    let chart = compute_layout(&mut scene, &fonts, &layout);
                    let svg = render_svg(&scene, &chart, &render);
                    black_box(svg.len());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_parse, bench_traversal, bench_end_to_end
);
criterion_main!(benches);
