//! Solves a small 0-1 knapsack instance and prints the chosen items.
//!
//! Run with `RUST_LOG=debug` to watch the node log.

use branchcut::{ConSense, Constraint, EngineSettings, Master, ObjSense, Problem, Variable};

fn main() {
    env_logger::init();

    let values = [60.0, 100.0, 120.0, 40.0, 75.0];
    let weights = [10.0, 20.0, 30.0, 15.0, 25.0];
    let capacity = 60.0;

    let mut prob = Problem::new(ObjSense::Max);
    let items: Vec<usize> = values
        .iter()
        .map(|&v| prob.push_variable(Variable::binary(v)))
        .collect();
    let row: Vec<(usize, f64)> = items.iter().copied().zip(weights).collect();
    prob.push_constraint(Constraint::new(row, ConSense::Le, capacity));

    let settings = EngineSettings::verbose();
    let mut master = Master::new(prob, settings).expect("valid problem");
    let solution = master.solve().expect("solve failed");

    println!("status:  {:?}", solution.status);
    println!("value:   {}", solution.obj_val);
    println!("nodes:   {}", solution.nodes_processed);
    println!("lps:     {}", solution.lps_solved);
    print!("packed:  ");
    for (i, &item) in items.iter().enumerate() {
        if solution.x[item] > 0.5 {
            print!("item{} (v={}, w={}) ", i, values[i], weights[i]);
        }
    }
    println!();
}
