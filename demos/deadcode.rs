use clap::{Parser, ValueEnum};
use log::info;

use dataflow_rs::cfg::Cfg;
use dataflow_rs::constprop::ConstantPropagation;
use dataflow_rs::deadcode::DeadCodeDetection;
use dataflow_rs::dot::DotConfig;
use dataflow_rs::ir::{BinaryOp, Exp, Ir, StmtKind};
use dataflow_rs::liveness::LiveVariableAnalysis;
use dataflow_rs::solver::{Solver, SolverConfig};
use dataflow_rs::types::Type;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Print the CFG in DOT format.
    #[clap(long)]
    dot: bool,

    /// Fill color of dead nodes in the DOT output.
    #[clap(long, value_enum, default_value_t = Color::Lightgray)]
    dead_color: Color,

    /// Maximum number of solver iterations.
    #[clap(long, value_name = "INT", default_value = "1000000")]
    max_iterations: usize,

    /// Log level.
    #[clap(long, value_name = "LEVEL", default_value = "info")]
    log_level: simplelog::LevelFilter,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Color {
    Lightgray,
    Red,
    Orange,
}

impl Color {
    fn name(self) -> &'static str {
        match self {
            Color::Lightgray => "lightgray",
            Color::Red => "red",
            Color::Orange => "orange",
        }
    }
}

/// Builds the procedure:
///
/// ```text
/// 0: x = 1
/// 1: c = 1
/// 2: if (x == c) goto 5
/// 3: y = 3
/// 4: goto 6
/// 5: y = 2
/// 6: invoke print(y)
/// 7: z = x + y
/// 8: return
/// ```
fn build_procedure() -> Ir {
    let mut ir = Ir::new();
    let x = ir.new_var("x", Type::Int);
    let c = ir.new_var("c", Type::Int);
    let y = ir.new_var("y", Type::Int);
    let z = ir.new_var("z", Type::Int);
    ir.assign(x, Exp::IntLiteral(1));
    ir.assign(c, Exp::IntLiteral(1));
    ir.push(StmtKind::If {
        cond: Exp::binary(BinaryOp::Eq, x, c),
        target: 5,
    });
    ir.assign(y, Exp::IntLiteral(3));
    ir.push(StmtKind::Goto { target: 6 });
    ir.assign(y, Exp::IntLiteral(2));
    ir.push(StmtKind::Invoke {
        result: None,
        method: "print".to_string(),
        args: vec![y],
    });
    ir.assign(z, Exp::binary(BinaryOp::Add, x, y));
    ir.push(StmtKind::Return(None));
    ir
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        args.log_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    println!("args = {:?}", args);

    let time_total = std::time::Instant::now();

    let ir = build_procedure();
    let cfg = Cfg::build(&ir)?;
    info!("CFG has {} nodes", cfg.len());

    let solver = Solver::with_config(SolverConfig::default().with_max_iterations(args.max_iterations));
    let constants = solver.solve(&ConstantPropagation::new(&ir), &cfg);
    let live_vars = solver.solve(&LiveVariableAnalysis::new(), &cfg);

    println!("Statements:");
    for stmt in ir.stmts() {
        let node = stmt.index();
        println!(
            "  [{}] {:<24} in = {}, live out = {}",
            node,
            stmt.to_string(),
            constants.in_fact(node),
            live_vars.out_fact(node)
        );
    }
    println!("Variables:");
    for var in ir.vars() {
        println!("  {} = {} : {}", var, ir.var_name(var), ir.var_type(var));
    }

    let dead = DeadCodeDetection::detect(&cfg, &constants, &live_vars);
    println!("Dead statements:");
    for &node in &dead {
        println!("  [{}] {}", node, cfg.stmt(node));
    }

    if args.dot {
        let config = DotConfig::default().with_dead_color(args.dead_color.name());
        println!("{}", cfg.to_dot_with_config(&dead, &config)?);
    }

    println!("All done in {:.3}s", time_total.elapsed().as_secs_f64());
    Ok(())
}
