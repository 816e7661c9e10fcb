use essay_pipeline::models::{read_table, write_table};
use essay_pipeline::orchestrator::{extract_stage, judgment_stage, partition_stage, score_stage};
use essay_pipeline::services::judgment_analysis::Comparison;
use essay_pipeline::{
    logging, Config, EssayRecord, JudgmentRow, PerplexityGroup, PredictabilityScorer, TestSetRow,
};
use std::fs;
use std::path::Path;

/// 以词数作为困惑度，少于 2 个词不评分
struct LengthScorer;

impl PredictabilityScorer for LengthScorer {
    async fn score(&self, text: &str) -> Option<f64> {
        let words = text.split_whitespace().count();
        (words >= 2).then_some(words as f64)
    }
}

fn config_in(dir: &Path) -> Config {
    let out = |name: &str| dir.join("outputs").join(name).display().to_string();
    Config {
        dataset_dir: dir.join("corpus").display().to_string(),
        extracted_csv: out("extracted.csv"),
        perplexity_csv: out("perplexity.csv"),
        test_set_csv: out("test_set.csv"),
        scoring_listing_txt: out("listing.txt"),
        judgment_csv: out("judgment.csv"),
        output_log_file: out("run.txt"),
        ..Config::default()
    }
}

fn essay_xml(language: &str, score: &str, answers: &[&str]) -> String {
    let answers: String = answers
        .iter()
        .map(|a| format!("<answer><coded_answer>{}</coded_answer></answer>", a))
        .collect();
    format!(
        "<?xml version=\"1.0\"?>\n<learner><head><candidate><personnel>\
         <language>{}</language><age>21-25</age></personnel>{}</candidate></head>\
         <text>{}</text></learner>",
        language, score, answers
    )
}

fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn build_corpus(root: &Path) {
    write_file(
        &root.join("2000/doc_fr.xml"),
        &essay_xml(
            "French",
            "<score>30</score>",
            &["Hello <error>worl</error>d", "Bye."],
        ),
    );
    write_file(
        &root.join("2000/doc_en.xml"),
        &essay_xml("English", "<score>35</score>", &["Native text here"]),
    );
    write_file(
        &root.join("2000/doc_EN.xml"),
        &essay_xml("ENGLISH", "<score>33</score>", &["More native text"]),
    );
    write_file(
        &root.join("2000/broken.xml"),
        "<learner><language>German</language><text>unterminated",
    );
    write_file(&root.join("2000/readme.txt"), "not a document");
    write_file(
        &root.join("2001/doc_es.xml"),
        "<learner><language>Spanish</language>\
         <coded_answer>\n  Buenos   dias \n</coded_answer></learner>",
    );
    write_file(
        &root.join("2001/outliers/doc_out.xml"),
        &essay_xml("Greek", "<score>40</score>", &["Excluded essay"]),
    );
}

#[tokio::test]
async fn test_extract_filters_and_skips_bad_documents() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    build_corpus(&dir.path().join("corpus"));
    logging::init_log_file(&config.output_log_file, "extract").unwrap();

    let stats = extract_stage::run(&config).await.unwrap();
    assert_eq!(stats.discovered, 5);
    assert_eq!(stats.parsed, 4);
    assert_eq!(stats.retained, 2);

    let content = fs::read_to_string(&config.extracted_csv).unwrap();
    assert_eq!(
        content,
        "filename,language,age,score,length,essay_text\n\
         doc_fr.xml,French,21-25,30.0,3,Hello world Bye.\n\
         doc_es.xml,Spanish,Unknown,0.0,2,Buenos   dias\n"
    );

    // 解析失败的文档记录在运行日志中
    let run_log = fs::read_to_string(&config.output_log_file).unwrap();
    assert!(run_log.contains("broken.xml"));
}

#[tokio::test]
async fn test_extract_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    build_corpus(&dir.path().join("corpus"));

    extract_stage::run(&config).await.unwrap();
    let first = fs::read(&config.extracted_csv).unwrap();
    extract_stage::run(&config).await.unwrap();
    let second = fs::read(&config.extracted_csv).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_extract_empty_corpus_writes_header() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write_file(
        &dir.path().join("corpus/a/only_native.xml"),
        &essay_xml("english", "<score>20</score>", &["Hi there"]),
    );

    let stats = extract_stage::run(&config).await.unwrap();
    assert_eq!(stats.retained, 0);
    assert_eq!(
        fs::read_to_string(&config.extracted_csv).unwrap(),
        "filename,language,age,score,length,essay_text\n"
    );
}

#[tokio::test]
async fn test_extract_missing_dataset_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let err = extract_stage::run(&config).await.unwrap_err();
    let app_err = err.downcast_ref::<essay_pipeline::AppError>().unwrap();
    assert!(app_err.is_missing_input());
    assert!(!Path::new(&config.extracted_csv).exists());
}

#[tokio::test]
async fn test_pipeline_from_scores_to_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    // 8 篇作文，分数 1..8，词数（即困惑度）与编号相反
    let essays: Vec<EssayRecord> = (1..=8)
        .map(|i| {
            let text = vec!["word"; 10 - i].join(" ");
            EssayRecord {
                filename: format!("doc{}.xml", i),
                language: "Korean".to_string(),
                age: "Unknown".to_string(),
                score: i as f64,
                length: 10 - i,
                essay_text: text,
            }
        })
        .collect();
    write_table(Path::new(&config.extracted_csv), &EssayRecord::COLUMNS, &essays)
        .await
        .unwrap();

    let scored = score_stage::run_with_scorer(&config, &LengthScorer).await.unwrap();
    assert_eq!(scored, 8);

    // 阈值 6.25 -> doc7 (困惑度 3), doc8 (困惑度 2)
    let rows = partition_stage::run(&config).await.unwrap();
    assert_eq!(rows, 2);
    let test_set: Vec<TestSetRow> = read_table(Path::new(&config.test_set_csv)).await.unwrap();
    assert_eq!(test_set[0].filename, "doc8.xml");
    assert_eq!(test_set[0].perplexity_group, PerplexityGroup::Low);
    assert_eq!(test_set[1].filename, "doc7.xml");
    assert_eq!(test_set[1].perplexity_group, PerplexityGroup::High);

    let listing = fs::read_to_string(&config.scoring_listing_txt).unwrap();
    assert!(listing.contains("ESSAY ID: doc8.xml"));
    assert!(listing.contains("Group: high"));

    let template_rows = judgment_stage::run_template(&config).await.unwrap();
    assert_eq!(template_rows, 2);

    // 未填写时分析只报告诊断信息
    let err = judgment_stage::analyze_file(Path::new(&config.judgment_csv))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("尚未填写"));
    judgment_stage::run_analyze(&config).await.unwrap();

    // 人工填写评分
    let mut template: Vec<JudgmentRow> =
        read_table(Path::new(&config.judgment_csv)).await.unwrap();
    for (i, row) in template.iter_mut().enumerate() {
        for run in 0..3 {
            row.set_run(run, Some(5.0 + i as f64));
        }
        row.recompute_mean();
    }
    write_table(Path::new(&config.judgment_csv), &JudgmentRow::COLUMNS, &template)
        .await
        .unwrap();

    let report = judgment_stage::analyze_file(Path::new(&config.judgment_csv))
        .await
        .unwrap();
    assert_eq!(report.low.unwrap().mean_llm, Some(5.0));
    assert_eq!(report.high.unwrap().mean_llm, Some(6.0));
    assert!(matches!(report.comparison, Comparison::Skipped));
}
