use crate::{
    error::{NIL_EXIT_CODE, ZERO_DIV_EXIT_CODE},
    syntax::{expr_stack::Operand, scope::Identifier, token::Operator},
};

use super::{runtime, Argument, Emitter, Generator, Label};

const TMP_1: &str = "GF@$tmp1";
const TMP_2: &str = "GF@$tmp2";
const COND: &str = "GF@$cond";
const COND_TYPE: &str = "GF@$cond_type";

/// Code of the function being generated. Declarations are collected apart
/// from the body so a loop never runs a `DEFVAR` twice.
#[derive(Debug)]
struct FunctionCode {
    name: String,
    prologue: Vec<String>,
    body: Vec<String>,
}

/// Generator producing IFJcode21 text for a stack based interpreter.
#[derive(Debug, Default)]
pub(crate) struct StackCode {
    functions: Vec<String>,
    main: Vec<String>,
    current: Option<FunctionCode>,
    next_label: Label,
}

impl StackCode {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self, line: impl Into<String>) {
        let line = line.into();
        match &mut self.current {
            Some(func) => func.body.push(line),
            None => self.main.push(line),
        }
    }

    fn label(&mut self) -> Label {
        let label = self.next_label;
        self.next_label += 1;
        label
    }

    fn end_label(&self) -> String {
        match &self.current {
            Some(func) => format!("${}$end", func.name),
            None => "$$main$end".into(),
        }
    }

    /// Pops the condition and jumps to `target` when it is `nil` or `false`.
    fn jump_if_falsy(&mut self, target: &str) {
        let truthy = format!("$truthy${}", self.label());
        self.emit(format!("POPS {COND}"));
        self.emit(format!("TYPE {COND_TYPE} {COND}"));
        self.emit(format!("JUMPIFEQ {target} {COND_TYPE} string@nil"));
        self.emit(format!("JUMPIFNEQ {truthy} {COND_TYPE} string@bool"));
        self.emit(format!("JUMPIFEQ {target} {COND} bool@false"));
        self.emit(format!("LABEL {truthy}"));
    }

    /// Pops `tmp` and stops the program with a nil error if it was nil.
    fn pop_non_nil(&mut self, tmp: &str) {
        let ok = format!("$nil_ok${}", self.label());
        self.emit(format!("POPS {tmp}"));
        self.emit(format!("JUMPIFNEQ {ok} {tmp} nil@nil"));
        self.emit(format!("EXIT int@{NIL_EXIT_CODE}"));
        self.emit(format!("LABEL {ok}"));
    }

    /// Moves the arguments into a fresh temporary frame and calls `name`.
    fn call_with_frame(&mut self, name: &str, args: &[Argument]) {
        self.emit("CREATEFRAME");
        for (i, arg) in args.iter().enumerate() {
            let param = format!("TF@%{}", i + 1);
            self.emit(format!("DEFVAR {param}"));
            self.emit(format!("MOVE {param} {}", symbol(&arg.operand)));
            if arg.promote {
                self.emit(format!("INT2FLOAT {param} {param}"));
            }
        }
        self.emit(format!("CALL ${name}"));
    }

    fn binary_via_temps(&mut self, instruction: &str, negate: bool) {
        self.emit(format!("POPS {TMP_2}"));
        self.emit(format!("POPS {TMP_1}"));
        self.emit(format!("{instruction} {TMP_1} {TMP_1} {TMP_2}"));
        if negate {
            self.emit(format!("NOT {TMP_1} {TMP_1}"));
        }
        self.emit(format!("PUSHS {TMP_1}"));
    }
}

fn var_name(var: &Identifier) -> String {
    format!("LF@{}%{}", var.name, var.index)
}

fn symbol(operand: &Operand) -> String {
    match operand {
        Operand::Integer(v) => format!("int@{v}"),
        Operand::Number(v) => format!("float@{}", hex_float(*v)),
        Operand::Str(s) => format!("string@{}", escape(s)),
        Operand::Boolean(b) => format!("bool@{b}"),
        Operand::Nil => "nil@nil".into(),
        Operand::Var(var) => var_name(var),
    }
}

/// Formats `v` like C's `%a`.
pub(crate) fn hex_float(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }

    let bits = v.to_bits();
    let sign = if bits >> 63 == 1 { "-" } else { "" };
    let biased = ((bits >> 52) & 0x7ff) as i64;
    let mantissa = bits & ((1 << 52) - 1);

    let (lead, exp) = match (biased, mantissa) {
        (0, 0) => (0, 0),
        (0, _) => (0, -1022),
        _ => (1, biased - 1023),
    };

    let digits = format!("{mantissa:013x}");
    let frac = digits.trim_end_matches('0');
    if frac.is_empty() {
        format!("{sign}0x{lead}p{exp:+}")
    } else {
        format!("{sign}0x{lead}.{frac}p{exp:+}")
    }
}

/// Escapes whitespace, control characters, `#` and `\` as `\ddd`.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c as u32 {
            0..=32 | 35 | 92 => out.push_str(&format!("\\{:03}", c as u32)),
            _ => out.push(c),
        }
    }
    out
}

impl Emitter for StackCode {
    fn push_operand(&mut self, operand: &Operand) {
        self.emit(format!("PUSHS {}", symbol(operand)));
    }

    fn operation(&mut self, op: Operator) {
        match op {
            Operator::Mul => self.emit("MULS"),
            Operator::Div => self.emit("DIVS"),
            Operator::IntDiv => self.emit("IDIVS"),
            Operator::Plus => self.emit("ADDS"),
            Operator::Minus => self.emit("SUBS"),
            Operator::Lt => self.emit("LTS"),
            Operator::Gt => self.emit("GTS"),
            Operator::Eq => self.emit("EQS"),
            Operator::Ne => {
                self.emit("EQS");
                self.emit("NOTS");
            }
            Operator::Le => self.binary_via_temps("GT", true),
            Operator::Ge => self.binary_via_temps("LT", true),
            Operator::Concat => self.binary_via_temps("CONCAT", false),
            Operator::Strlen => {
                self.emit(format!("POPS {TMP_1}"));
                self.emit(format!("STRLEN {TMP_1} {TMP_1}"));
                self.emit(format!("PUSHS {TMP_1}"));
            }
        }
    }

    fn nil_check_top(&mut self) {
        self.pop_non_nil(TMP_1);
        self.emit(format!("PUSHS {TMP_1}"));
    }

    fn nil_check_second(&mut self) {
        self.emit(format!("POPS {TMP_1}"));
        self.pop_non_nil(TMP_2);
        self.emit(format!("PUSHS {TMP_2}"));
        self.emit(format!("PUSHS {TMP_1}"));
    }

    fn zero_div_check(&mut self) {
        let n = self.label();
        self.emit(format!("POPS {TMP_1}"));
        self.emit(format!("TYPE {TMP_2} {TMP_1}"));
        self.emit(format!("JUMPIFEQ $zero_float${n} {TMP_2} string@float"));
        self.emit(format!("JUMPIFNEQ $zero_ok${n} {TMP_1} int@0"));
        self.emit(format!("JUMP $zero${n}"));
        self.emit(format!("LABEL $zero_float${n}"));
        self.emit(format!("JUMPIFNEQ $zero_ok${n} {TMP_1} float@0x0p+0"));
        self.emit(format!("LABEL $zero${n}"));
        self.emit(format!("EXIT int@{ZERO_DIV_EXIT_CODE}"));
        self.emit(format!("LABEL $zero_ok${n}"));
        self.emit(format!("PUSHS {TMP_1}"));
    }

    fn promote_top_to_number(&mut self) {
        self.emit("INT2FLOATS");
    }

    fn promote_second_to_number(&mut self) {
        self.emit(format!("POPS {TMP_1}"));
        self.emit("INT2FLOATS");
        self.emit(format!("PUSHS {TMP_1}"));
    }
}

impl Generator for StackCode {
    fn function_start(&mut self, func: &Identifier, params: &[&Identifier]) {
        let mut code = FunctionCode {
            name: func.name.clone(),
            prologue: vec![format!("LABEL ${}", func.name), "PUSHFRAME".into()],
            body: vec![],
        };
        let rets = func.signature().map_or(0, |sig| sig.rets.len());
        for k in 1..=rets {
            code.prologue.push(format!("DEFVAR LF@%retval{k}"));
            code.prologue.push(format!("MOVE LF@%retval{k} nil@nil"));
        }
        for (i, param) in params.iter().enumerate() {
            let name = var_name(param);
            code.prologue.push(format!("DEFVAR {name}"));
            code.prologue.push(format!("MOVE {name} LF@%{}", i + 1));
        }
        self.current = Some(code);
    }

    fn function_end(&mut self, func: &Identifier) {
        let Some(code) = self.current.take() else {
            log::warn!("end of `{}` without a start", func.name);
            return;
        };

        self.functions.extend(code.prologue);
        self.functions.extend(code.body);
        self.functions.push(format!("LABEL ${}$end", code.name));
        self.functions.push("POPFRAME".into());
        self.functions.push("RETURN".into());
        self.functions.push(String::new());
    }

    fn declare_var(&mut self, var: &Identifier) {
        let name = var_name(var);
        match &mut self.current {
            Some(func) => func.prologue.push(format!("DEFVAR {name}")),
            None => self.main.push(format!("DEFVAR {name}")),
        }
        self.emit(format!("MOVE {name} nil@nil"));
    }

    fn assign_top(&mut self, var: &Identifier) {
        self.emit(format!("POPS {}", var_name(var)));
    }

    fn call(&mut self, func: &Identifier, args: &[Argument]) {
        if !func.signature().is_some_and(|sig| sig.variadic) {
            self.call_with_frame(&func.name, args);
            return;
        }

        for arg in args {
            match &arg.operand {
                Operand::Var(_) => self.call_with_frame(&func.name, std::slice::from_ref(arg)),
                Operand::Nil => self.emit("WRITE string@nil"),
                literal => self.emit(format!("WRITE {}", symbol(literal))),
            }
        }
    }

    fn push_returned(&mut self, index: usize) {
        self.emit(format!("PUSHS TF@%retval{index}"));
    }

    fn return_values(&mut self, count: usize) {
        let end = self.end_label();
        for k in (1..=count).rev() {
            self.emit(format!("POPS LF@%retval{k}"));
        }
        self.emit(format!("JUMP {end}"));
    }

    fn if_start(&mut self) -> Label {
        let label = self.label();
        self.jump_if_falsy(&format!("$else${label}"));
        label
    }

    fn if_else(&mut self, label: Label) {
        self.emit(format!("JUMP $endif${label}"));
        self.emit(format!("LABEL $else${label}"));
    }

    fn if_end(&mut self, label: Label) {
        self.emit(format!("LABEL $endif${label}"));
    }

    fn while_start(&mut self) -> Label {
        let label = self.label();
        self.emit(format!("LABEL $while${label}"));
        label
    }

    fn while_cond(&mut self, label: Label) {
        self.jump_if_falsy(&format!("$endwhile${label}"));
    }

    fn while_end(&mut self, label: Label) {
        self.emit(format!("JUMP $while${label}"));
        self.emit(format!("LABEL $endwhile${label}"));
    }

    fn finish(self) -> String {
        let header = [
            ".IFJcode21".to_string(),
            format!("DEFVAR {TMP_1}"),
            format!("DEFVAR {TMP_2}"),
            format!("DEFVAR {COND}"),
            format!("DEFVAR {COND_TYPE}"),
            "JUMP $$main".into(),
            String::new(),
        ];

        header
            .into_iter()
            .chain(runtime::library())
            .chain(std::iter::once(String::new()))
            .chain(self.functions)
            .chain(std::iter::once("LABEL $$main".to_string()))
            .chain(self.main)
            .map(|line| line + "\n")
            .collect()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{escape, hex_float, StackCode};
    use crate::{
        codegen::{Emitter, Generator},
        syntax::{expr_stack::Operand, token::Operator, Parser},
    };

    #[test]
    fn hex_floats() {
        assert_eq!(hex_float(0.0), "0x0p+0");
        assert_eq!(hex_float(1.0), "0x1p+0");
        assert_eq!(hex_float(1.5), "0x1.8p+0");
        assert_eq!(hex_float(-2.0), "-0x1p+1");
        assert_eq!(hex_float(0.1), "0x1.999999999999ap-4");
        assert_eq!(hex_float(f64::from_bits(1)), "0x0.0000000000001p-1022");
    }

    #[test]
    fn escapes() {
        assert_eq!(escape("a b#c\\\n"), "a\\032b\\035c\\092\\010");
        assert_eq!(escape("žluť"), "žluť");
    }

    #[test]
    fn expression_code() {
        let mut code = StackCode::new();
        code.push_operand(&Operand::Integer(1));
        code.push_operand(&Operand::Number(2.5));
        code.promote_second_to_number();
        code.operation(Operator::Le);

        assert_eq!(
            code.main,
            vec![
                "PUSHS int@1",
                "PUSHS float@0x1.4p+1",
                "POPS GF@$tmp1",
                "INT2FLOATS",
                "PUSHS GF@$tmp1",
                "POPS GF@$tmp2",
                "POPS GF@$tmp1",
                "GT GF@$tmp1 GF@$tmp1 GF@$tmp2",
                "NOT GF@$tmp1 GF@$tmp1",
                "PUSHS GF@$tmp1",
            ]
        );
    }

    #[test]
    fn guards_exit_with_runtime_codes() {
        let mut code = StackCode::new();
        code.nil_check_top();
        code.zero_div_check();

        assert!(code.main.contains(&"EXIT int@8".to_string()));
        assert!(code.main.contains(&"EXIT int@9".to_string()));
        assert_ne!(code.next_label, 0);
    }

    #[test]
    fn declarations_are_hoisted() {
        let src = "function main()
                local i : integer = 0
                while i < 3 do
                    local j : integer = i
                    i = j + 1
                end
            end
            main()";
        let code = Parser::new(src, StackCode::new())
            .parse_program()
            .unwrap()
            .finish();
        let lines: Vec<&str> = code.lines().collect();

        let defvar_j = lines.iter().position(|l| *l == "DEFVAR LF@j%10").unwrap();
        let loop_start = lines.iter().position(|l| *l == "LABEL $while$0").unwrap();
        assert!(defvar_j < loop_start);
        assert_eq!(lines.iter().filter(|l| **l == "DEFVAR LF@j%10").count(), 1);

        assert_eq!(lines[0], ".IFJcode21");
        assert!(lines.contains(&"LABEL $main"));
        assert!(lines.contains(&"LABEL $main$end"));

        let main = lines.iter().position(|l| *l == "LABEL $$main").unwrap();
        assert_eq!(&lines[main + 1..], &["CREATEFRAME", "CALL $main"]);
    }

    #[test]
    fn call_arguments() {
        let src = "function f(a : number, s : string)
            end
            f(1, \"x y\")";
        let code = Parser::new(src, StackCode::new())
            .parse_program()
            .unwrap()
            .finish();

        let expected = "CREATEFRAME\n\
                        DEFVAR TF@%1\n\
                        MOVE TF@%1 int@1\n\
                        INT2FLOAT TF@%1 TF@%1\n\
                        DEFVAR TF@%2\n\
                        MOVE TF@%2 string@x\\032y\n\
                        CALL $f\n";
        assert!(code.ends_with(expected), "{code}");
    }

    fn compile(src: &str) -> String {
        Parser::new(src, StackCode::new())
            .parse_program()
            .unwrap()
            .finish()
    }

    #[test]
    fn runtime_library_precedes_functions() {
        let code = compile("function main() end main()");
        let lines: Vec<&str> = code.lines().collect();

        let chr = lines.iter().position(|l| *l == "LABEL $chr").unwrap();
        let main = lines.iter().position(|l| *l == "LABEL $main").unwrap();
        assert!(chr < main);
        assert!(lines.contains(&"READ LF@%retval1 int"));
    }

    #[test]
    fn write_takes_each_argument() {
        let code = compile(
            "function main()
                local s : string = \"a\"
                write(\"x y\", 2, s, nil)
            end",
        );
        let lines: Vec<&str> = code.lines().collect();
        let first = lines.iter().position(|l| *l == "WRITE string@x\\032y").unwrap();

        assert_eq!(
            &lines[first..first + 7],
            &[
                "WRITE string@x\\032y",
                "WRITE int@2",
                "CREATEFRAME",
                "DEFVAR TF@%1",
                "MOVE TF@%1 LF@s%9",
                "CALL $write",
                "WRITE string@nil",
            ]
        );
    }

    #[test]
    fn multiple_return_values() {
        let code = compile(
            "function pair() : integer, string
                return 1, \"a\"
            end
            function main()
                local i : integer
                local s : string
                i, s = pair()
            end",
        );
        let lines: Vec<&str> = code.lines().collect();

        let start = lines.iter().position(|l| *l == "LABEL $pair").unwrap();
        assert_eq!(
            &lines[start..start + 6],
            &[
                "LABEL $pair",
                "PUSHFRAME",
                "DEFVAR LF@%retval1",
                "MOVE LF@%retval1 nil@nil",
                "DEFVAR LF@%retval2",
                "MOVE LF@%retval2 nil@nil",
            ]
        );

        let ret = lines.iter().position(|l| *l == "POPS LF@%retval2").unwrap();
        assert_eq!(
            &lines[ret..ret + 3],
            &["POPS LF@%retval2", "POPS LF@%retval1", "JUMP $pair$end"]
        );

        let call = lines.iter().position(|l| *l == "CALL $pair").unwrap();
        assert_eq!(
            &lines[call + 1..call + 5],
            &[
                "PUSHS TF@%retval1",
                "POPS LF@i%10",
                "PUSHS TF@%retval2",
                "POPS LF@s%11",
            ]
        );
    }
}
