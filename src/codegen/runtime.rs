use crate::error::NIL_EXIT_CODE;

/// Bodies of the builtin functions. They follow the calling convention of
/// compiled functions: arguments in `LF@%1..`, results in `LF@%retval1`.
pub(super) fn library() -> Vec<String> {
    let code = format!(
        r"LABEL $reads
PUSHFRAME
DEFVAR LF@%retval1
READ LF@%retval1 string
POPFRAME
RETURN

LABEL $readi
PUSHFRAME
DEFVAR LF@%retval1
READ LF@%retval1 int
POPFRAME
RETURN

LABEL $readn
PUSHFRAME
DEFVAR LF@%retval1
READ LF@%retval1 float
POPFRAME
RETURN

LABEL $write
PUSHFRAME
DEFVAR LF@$type
TYPE LF@$type LF@%1
JUMPIFEQ $write$nil LF@$type string@nil
WRITE LF@%1
JUMP $write$end
LABEL $write$nil
WRITE string@nil
LABEL $write$end
POPFRAME
RETURN

LABEL $tointeger
PUSHFRAME
DEFVAR LF@%retval1
MOVE LF@%retval1 nil@nil
DEFVAR LF@$type
TYPE LF@$type LF@%1
JUMPIFEQ $tointeger$end LF@$type string@nil
FLOAT2INT LF@%retval1 LF@%1
LABEL $tointeger$end
POPFRAME
RETURN

LABEL $substr
PUSHFRAME
DEFVAR LF@%retval1
DEFVAR LF@$char
DEFVAR LF@$counter
DEFVAR LF@$limit
DEFVAR LF@$type
DEFVAR LF@$bad
DEFVAR LF@$bad2
DEFVAR LF@$len
TYPE LF@$type LF@%1
JUMPIFEQ $substr$nil LF@$type string@nil
TYPE LF@$type LF@%2
JUMPIFEQ $substr$nil LF@$type string@nil
TYPE LF@$type LF@%3
JUMPIFEQ $substr$nil LF@$type string@nil
JUMP $substr$args
LABEL $substr$nil
EXIT int@{NIL_EXIT_CODE}
LABEL $substr$args
FLOAT2INT LF@$counter LF@%2
FLOAT2INT LF@$limit LF@%3
STRLEN LF@$len LF@%1
LT LF@$bad LF@$counter int@1
GT LF@$bad2 LF@$counter LF@$limit
OR LF@$bad LF@$bad LF@$bad2
GT LF@$bad2 LF@$limit LF@$len
OR LF@$bad LF@$bad LF@$bad2
MOVE LF@%retval1 string@
JUMPIFEQ $substr$end LF@$bad bool@true
SUB LF@$counter LF@$counter int@1
LABEL $substr$loop
JUMPIFEQ $substr$end LF@$counter LF@$limit
GETCHAR LF@$char LF@%1 LF@$counter
CONCAT LF@%retval1 LF@%retval1 LF@$char
ADD LF@$counter LF@$counter int@1
JUMP $substr$loop
LABEL $substr$end
POPFRAME
RETURN

LABEL $ord
PUSHFRAME
DEFVAR LF@%retval1
MOVE LF@%retval1 nil@nil
DEFVAR LF@$index
DEFVAR LF@$bad
DEFVAR LF@$bad2
DEFVAR LF@$len
DEFVAR LF@$type
TYPE LF@$type LF@%1
JUMPIFEQ $ord$end LF@$type string@nil
TYPE LF@$type LF@%2
JUMPIFEQ $ord$end LF@$type string@nil
STRLEN LF@$len LF@%1
LT LF@$bad LF@%2 int@1
GT LF@$bad2 LF@%2 LF@$len
OR LF@$bad LF@$bad LF@$bad2
JUMPIFEQ $ord$end LF@$bad bool@true
SUB LF@$index LF@%2 int@1
STRI2INT LF@%retval1 LF@%1 LF@$index
LABEL $ord$end
POPFRAME
RETURN

LABEL $chr
PUSHFRAME
DEFVAR LF@%retval1
MOVE LF@%retval1 nil@nil
DEFVAR LF@$bad
DEFVAR LF@$bad2
DEFVAR LF@$type
TYPE LF@$type LF@%1
JUMPIFNEQ $chr$arg LF@$type string@nil
EXIT int@{NIL_EXIT_CODE}
LABEL $chr$arg
LT LF@$bad LF@%1 int@0
GT LF@$bad2 LF@%1 int@255
OR LF@$bad LF@$bad LF@$bad2
JUMPIFEQ $chr$end LF@$bad bool@true
INT2CHAR LF@%retval1 LF@%1
LABEL $chr$end
POPFRAME
RETURN
"
    );

    code.lines().map(String::from).collect()
}
