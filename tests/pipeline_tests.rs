#[cfg(test)]
mod pipeline_tests {
    use std::collections::BTreeSet;
    use std::fs;

    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    use talkgraph::analysis::transcript::ThreadRecord;
    use talkgraph::analysis::{self, AnalysisOptions, AnalysisRequest, NetworkGraph, RawTranscript};
    use talkgraph::source::{FileSource, SourceError};

    const SHORT_CHAT: &str = "[01.01.2024, 10:00:00] A: hi\n\
                              [01.01.2024, 10:00:05] B: hello\n\
                              [01.01.2024, 10:00:10] A: bye\n";

    fn chat(text: &str) -> RawTranscript {
        RawTranscript::ChatExport(text.to_string())
    }

    fn record(sender: &str, content: &str) -> ThreadRecord {
        ThreadRecord {
            timestamp: None,
            sender: Some(sender.to_string()),
            content: Some(content.to_string()),
        }
    }

    fn records(senders: &[&str]) -> RawTranscript {
        RawTranscript::Records(senders.iter().map(|s| record(s, "text")).collect())
    }

    fn node_ids(graph: &NetworkGraph) -> BTreeSet<String> {
        graph.nodes.iter().map(|n| n.id.clone()).collect()
    }

    /// Three-message exchange with no options
    #[test]
    fn test_short_exchange() {
        let graph = analysis::analyze(&chat(SHORT_CHAT), &AnalysisOptions::default());

        assert_eq!(graph.nodes.len(), 2);
        let a = graph.node("A").unwrap();
        let b = graph.node("B").unwrap();
        assert_eq!(a.messages, 2);
        assert_eq!(b.messages, 1);
        assert_eq!(a.degree, 1.0);
        assert_eq!(b.degree, 1.0);

        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.link("A", "B").unwrap().weight, 2);
    }

    /// Two-node graph: every metric is symmetric
    #[test]
    fn test_two_node_metrics() {
        let graph = analysis::analyze(&chat(SHORT_CHAT), &AnalysisOptions::default());
        for node in &graph.nodes {
            assert_eq!(node.betweenness, 0.0);
            assert_eq!(node.closeness, 1.0);
            assert_eq!(node.pagerank, 0.5);
        }
    }

    /// min_messages=2 keeps only A, and the A-B link goes with B
    #[test]
    fn test_min_messages_drops_link() {
        let request = AnalysisRequest {
            min_messages: Some(2),
            ..Default::default()
        };
        let graph = analysis::analyze(&chat(SHORT_CHAT), &request.to_options());

        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, "A");
        assert_eq!(graph.nodes[0].messages, 2);
        assert!(graph.links.is_empty());
    }

    #[test]
    fn test_empty_transcript() {
        let graph = analysis::analyze(&chat(""), &AnalysisOptions::default());
        assert_eq!(graph, NetworkGraph::default());

        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json, serde_json::json!({"nodes": [], "links": []}));
    }

    /// Filters that remove everyone give an empty result, not an error
    #[test]
    fn test_filters_remove_everyone() {
        let request = AnalysisRequest {
            keywords: Some("nothing matches this".to_string()),
            ..Default::default()
        };
        let graph = analysis::analyze(&chat(SHORT_CHAT), &request.to_options());
        assert!(graph.is_empty());
        assert!(graph.links.is_empty());
    }

    #[test]
    fn test_complete_graph_degree() {
        // Every pair of A, B, C, D speaks in adjacent turns at least once
        let transcript = records(&["A", "B", "C", "D", "A", "C", "B", "D"]);
        let graph = analysis::analyze(&transcript, &AnalysisOptions::default());

        assert_eq!(graph.links.len(), 6);
        for node in &graph.nodes {
            assert_eq!(node.degree, 1.0, "{}", node.id);
        }
    }

    /// Selecting every node explicitly changes nothing
    #[test]
    fn test_explicit_participants_full_set_is_noop() {
        let transcript = records(&["Ann", "Ben", "Ann", "Cy", "Ben", "Dee", "Cy"]);
        let baseline = analysis::analyze(&transcript, &AnalysisOptions::default());

        let everyone: Vec<String> = baseline.nodes.iter().map(|n| n.id.clone()).collect();
        let request = AnalysisRequest {
            selected_users: Some(everyone.join(",")),
            ..Default::default()
        };
        let selected = analysis::analyze(&transcript, &request.to_options());

        assert_eq!(selected, baseline);
    }

    #[test]
    fn test_anonymization_is_stable_and_injective() {
        let transcript = records(&["Alice", "+972 50-123-4567", "Bob", "Alice", "\u{202A}+44 7700 900123"]);
        let options = AnalysisOptions {
            anonymize: true,
            ..Default::default()
        };

        let first = analysis::analyze(&transcript, &options);
        let second = analysis::analyze(&transcript, &options);
        assert_eq!(first, second);

        let ids: Vec<&str> = first.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["User_1", "Phone_2", "User_3", "Phone_4"]);

        // Links use the same pseudonyms as nodes
        for link in &first.links {
            assert!(first.node(&link.source).is_some());
            assert!(first.node(&link.target).is_some());
        }
        assert!(first.nodes.iter().all(|n| n.id != "Alice" && n.id != "Bob"));
    }

    #[test]
    fn test_disconnected_graph_zero_fill() {
        // X bridges the two halves; once X is excluded, A-B and C-D are
        // separate components of equal size and A-B (found first) wins
        let transcript = records(&["A", "B", "A", "X", "C", "D", "C"]);
        let request = AnalysisRequest {
            selected_users: Some("a,b,c,d".to_string()),
            ..Default::default()
        };
        let graph = analysis::analyze(&transcript, &request.to_options());

        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.links.len(), 2);
        assert!(graph.link("B", "X").is_none());

        for id in ["C", "D"] {
            let node = graph.node(id).unwrap();
            assert_eq!(node.closeness, 0.0);
            assert_eq!(node.eigenvector, 0.0);
            assert_eq!(node.pagerank, 0.0);
            // Still connected within their own component
            assert_eq!(node.degree, 0.3333);
        }
        for id in ["A", "B"] {
            let node = graph.node(id).unwrap();
            assert_eq!(node.closeness, 1.0);
            assert_eq!(node.pagerank, 0.5);
        }
    }

    /// The node set depends on who survives, not on message order
    #[test]
    fn test_node_set_independent_of_order() {
        let senders: Vec<&str> = vec![
            "Ann", "Ben", "Ann", "Cy", "Ben", "Dee", "Cy", "Ann", "Eve", "Dee", "Ben", "Ann",
        ];
        let request = AnalysisRequest {
            min_messages: Some(2),
            ..Default::default()
        };
        let options = request.to_options();
        let baseline = node_ids(&analysis::analyze(&records(&senders), &options));

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10 {
            let mut shuffled = senders.clone();
            shuffled.shuffle(&mut rng);
            let graph = analysis::analyze(&records(&shuffled), &options);
            assert_eq!(node_ids(&graph), baseline);
        }
    }

    #[test]
    fn test_time_window_and_limit() {
        let transcript = chat(
            "[01.01.2024, 09:00:00] A: early\n\
             [01.01.2024, 10:00:00] B: one\n\
             [01.01.2024, 10:30:00] C: two\n\
             [01.01.2024, 11:00:00] D: three\n\
             [01.01.2024, 12:00:00] E: late\n",
        );
        let request = AnalysisRequest {
            start_date: Some("2024-01-01".to_string()),
            start_time: Some("10:00".to_string()),
            end_date: Some("2024-01-01".to_string()),
            end_time: Some("11:00".to_string()),
            limit: Some(2),
            limit_type: Some("last".to_string()),
            ..Default::default()
        };
        let graph = analysis::analyze(&transcript, &request.to_options());

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "D"]);
        assert_eq!(graph.link("C", "D").unwrap().weight, 1);
    }

    #[test]
    fn test_chat_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_chat.txt");
        fs::write(
            &path,
            "\u{200E}[01.01.2024, 10:00:00] \u{200E}Messages and calls are end-to-end encrypted.\n\
             [01.01.2024, 10:00:00] ~\u{202F}Alice: first line\n\
             second line\n\
             [01.01.2024, 10:01:00] Bob: reply\n\
             [99.99.2024, 10:02:00] Bob: broken timestamp\n\
             [01.01.2024, 10:03:00] Alice: ok\n",
        )
        .unwrap();

        let graph = analysis::analyze_source(&FileSource::new(&path), &AnalysisOptions::default()).unwrap();
        assert_eq!(graph.link("Alice", "Bob").unwrap().weight, 2);
        assert_eq!(graph.node("Alice").unwrap().messages, 2);
        assert_eq!(graph.node("Bob").unwrap().messages, 1);
    }

    #[test]
    fn test_talk_page_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Talk_Proposal.wiki");
        fs::write(
            &path,
            "== Proposal ==\n\
             I think we should merge the two articles. [[User:Alice|Alice]] ([[User talk:Alice|talk]]) 10:00, 5 March 2024 (UTC)\n\
             :Disagree, they cover different periods. [[User:Bob|Bob]] 10:05, 5 March 2024 (UTC)\n\
             ::Why? [[User:Alice|Alice]] 10:10, 5 March 2024 (UTC)\n\
             == Unrelated ==\n\
             Text nobody signed\n",
        )
        .unwrap();

        let graph = analysis::analyze_source(&FileSource::new(&path), &AnalysisOptions::default()).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.node("Alice").unwrap().messages, 2);
        assert_eq!(graph.link("Alice", "Bob").unwrap().weight, 2);
    }

    #[test]
    fn test_records_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thread.json");
        fs::write(
            &path,
            r#"[
                {"timestamp": "2024-01-01T10:00:00Z", "sender": "A", "content": "hi"},
                {"timestamp": "not a time", "sender": "B", "content": "hello"},
                {"timestamp": null, "sender": "", "content": "dropped"},
                {"timestamp": "2024-01-01T10:02:00", "sender": "A"}
            ]"#,
        )
        .unwrap();

        let graph = analysis::analyze_source(&FileSource::new(&path), &AnalysisOptions::default()).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.link("A", "B").unwrap().weight, 2);
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let result = analysis::analyze_source(&FileSource::new("/nonexistent/chat.txt"), &AnalysisOptions::default());
        assert!(matches!(result, Err(SourceError::NotFound { .. })));
    }

    /// Parallel batch analysis gives the same graphs as one-by-one analysis
    #[test]
    fn test_batch_matches_sequential() {
        let anonymized = AnalysisOptions {
            anonymize: true,
            ..Default::default()
        };
        let jobs = vec![
            (chat(SHORT_CHAT), AnalysisOptions::default()),
            (records(&["A", "B", "C", "A", "C"]), anonymized.clone()),
            (chat(""), AnalysisOptions::default()),
            (records(&["A", "B", "X", "C", "D"]), anonymized),
        ];

        let batch = analysis::analyze_batch(&jobs);
        assert_eq!(batch.len(), jobs.len());
        for ((transcript, options), (_, result)) in jobs.iter().zip(batch) {
            assert_eq!(result.unwrap(), analysis::analyze(transcript, options));
        }
    }
}
