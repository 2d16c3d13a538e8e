use han_segment::{FreqDict, Segmenter};

fn main() {
    // The classic garden-path sentence: "Nanjing City Yangtze River Bridge"
    // vs "the mayor of Nanjing, Jiang Daqiao". Frequencies decide.
    let entries = vec![
        ("南京".into(), 10_000),
        ("南京市".into(), 1_500),
        ("市长".into(), 3_000),
        ("市".into(), 600),
        ("长".into(), 500),
        ("长江".into(), 800),
        ("长江大桥".into(), 400),
        ("江".into(), 300),
        ("大桥".into(), 900),
    ];

    let segmenter = Segmenter::new(FreqDict::from_entries(entries));
    let words = segmenter.cut("南京市长江大桥").collect::<Vec<&str>>();

    println!("{:?}", words);
}
