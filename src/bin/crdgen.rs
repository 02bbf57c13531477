use kube::core::CustomResourceExt;
use orchestrator_operator::crd::orchestrator::Orchestrator;

fn main() {
    let crd = Orchestrator::crd();
    let yaml = serde_yaml::to_string(&crd).expect("serialize CRD to YAML");
    println!("{}", yaml);
}
