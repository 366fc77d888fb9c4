use readability_engine::{Document, Readability, ReadabilityOptions};
use std::thread;

fn page(topic: usize) -> String {
    let paragraph = format!(
        "Report {topic} covers the harbour, the market, and the new bridge, with quotes from residents who watched it open."
    );
    format!(
        r#"<html><head><title>Report number {topic} from the city desk</title></head><body><article><p>{paragraph}</p><p>{paragraph}</p><p>{paragraph}</p><p>{paragraph}</p><p>{paragraph}</p></article><div class="sidebar">Related links</div></body></html>"#
    )
}

#[test]
fn test_independent_documents_in_parallel() {
    let pages: Vec<String> = (0..8).map(page).collect();

    let expected: Vec<_> = pages
        .iter()
        .map(|html| Readability::new(html, None, None).unwrap().parse().unwrap())
        .collect();

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = pages
            .iter()
            .map(|html| {
                scope.spawn(move || Readability::new(html, None, None).unwrap().parse().unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results, expected);
    for (i, article) in results.iter().enumerate() {
        let article = article.as_ref().unwrap();
        assert!(article.text_content.contains(&format!("Report {i} covers")));
        assert!(!article.text_content.contains("Related links"));
    }
}

#[test]
fn test_shared_document_and_options() {
    let document = Document::parse(&page(3));
    let options = ReadabilityOptions::builder()
        .char_threshold(200)
        .serializer(|doc, node| doc.text_content(node))
        .build();

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let document = &document;
                let options = options.clone();
                scope.spawn(move || {
                    Readability::from_document(document, None, Some(options))
                        .unwrap()
                        .parse()
                        .unwrap()
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(results[0].content, results[0].text_content);
}
